use reqwest::Method;

use copyforge_common::Article;

use crate::types::{ArticleUpdate, ArticlesPayload, NewArticle};
use crate::{ApiClient, Result};

impl ApiClient {
    /// List the caller's articles, normalized to a plain vector whatever
    /// shape the backend used.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let payload: ArticlesPayload = self
            .send_json(self.request(Method::GET, "/api/articles"))
            .await?;
        Ok(payload.into_articles())
    }

    pub async fn get_article(&self, id: &str) -> Result<Article> {
        self.send_json(self.request(Method::GET, &format!("/api/articles/{id}")))
            .await
    }

    pub async fn create_article(&self, article: &NewArticle) -> Result<Article> {
        let builder = self.request(Method::POST, "/api/articles").json(article);
        self.send_json(builder).await
    }

    pub async fn update_article(&self, id: &str, update: &ArticleUpdate) -> Result<Article> {
        let builder = self
            .request(Method::PUT, &format!("/api/articles/{id}"))
            .json(update);
        self.send_json(builder).await
    }

    pub async fn delete_article(&self, id: &str) -> Result<()> {
        self.send_unit(self.request(Method::DELETE, &format!("/api/articles/{id}")))
            .await
    }
}
