use copyforge_common::{Article, Plan, ProfileSnapshot};
use serde::{Deserialize, Serialize};

/// `GET /api/profile` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub plan: Plan,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub usage: UsageReport,
    #[serde(default)]
    pub tools_today: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageReport {
    #[serde(default)]
    pub today: PeriodUsage,
    #[serde(default)]
    pub week: PeriodUsage,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PeriodUsage {
    #[serde(default)]
    pub generations: u32,
}

impl From<ProfileResponse> for ProfileSnapshot {
    fn from(profile: ProfileResponse) -> Self {
        ProfileSnapshot {
            plan: profile.plan,
            today_generations: profile.usage.today.generations,
            week_generations: profile.usage.week.generations,
            tools_today: profile.tools_today,
        }
    }
}

/// `POST /api/draft` request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DraftRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_word_count: Option<u32>,
    pub include_images: bool,
    pub include_faq: bool,
}

/// Article fields for `POST /api/articles`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
}

/// Partial update for `PUT /api/articles/:id`. Absent fields are left
/// unchanged server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Stripe session URL for checkout and the billing portal.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingSession {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthRedirect {
    pub url: String,
}

/// The articles list arrives either bare or wrapped in `{"articles": []}`,
/// depending on the backend version. Both decode to a plain vector.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ArticlesPayload {
    Bare(Vec<Article>),
    Wrapped {
        #[serde(default)]
        articles: Vec<Article>,
    },
}

impl ArticlesPayload {
    pub(crate) fn into_articles(self) -> Vec<Article> {
        match self {
            ArticlesPayload::Bare(list) => list,
            ArticlesPayload::Wrapped { articles } => articles,
        }
    }
}
