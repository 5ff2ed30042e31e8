//! The SEO toolkit endpoints. Each tool is a stateless request/response
//! pair under `/api/tools/`; callers gate and record tool usage through the
//! quota layer before invoking any of these.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{ApiClient, Result};

#[derive(Debug, Clone, Serialize)]
pub struct MetaDescriptionRequest {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaDescriptionResponse {
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadabilityReport {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordReport {
    #[serde(default)]
    pub keywords: Vec<KeywordEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadlineAnalysis {
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SerpPreviewRequest {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Title and description as Google would render them, truncated to the
/// pixel budget server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct SerpPreview {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub display_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlagiarismReport {
    /// 0.0 to 1.0; higher means more original.
    #[serde(default)]
    pub originality: f64,
    #[serde(default)]
    pub matches: Vec<PlagiarismMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlagiarismMatch {
    pub source: String,
    #[serde(default)]
    pub similarity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitorReport {
    #[serde(default)]
    pub competitors: Vec<CompetitorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompetitorEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub word_count: u32,
}

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct HeadlineBody<'a> {
    headline: &'a str,
}

#[derive(Serialize)]
struct KeywordBody<'a> {
    keyword: &'a str,
}

impl ApiClient {
    pub async fn meta_description(
        &self,
        request: &MetaDescriptionRequest,
    ) -> Result<MetaDescriptionResponse> {
        let builder = self
            .request(Method::POST, "/api/tools/meta-description")
            .json(request);
        self.send_json(builder).await
    }

    pub async fn readability(&self, content: &str) -> Result<ReadabilityReport> {
        let builder = self
            .request(Method::POST, "/api/tools/readability")
            .json(&ContentBody { content });
        self.send_json(builder).await
    }

    pub async fn extract_keywords(&self, content: &str) -> Result<KeywordReport> {
        let builder = self
            .request(Method::POST, "/api/tools/keywords")
            .json(&ContentBody { content });
        self.send_json(builder).await
    }

    pub async fn analyze_headline(&self, headline: &str) -> Result<HeadlineAnalysis> {
        let builder = self
            .request(Method::POST, "/api/tools/headline")
            .json(&HeadlineBody { headline });
        self.send_json(builder).await
    }

    pub async fn serp_preview(&self, request: &SerpPreviewRequest) -> Result<SerpPreview> {
        let builder = self
            .request(Method::POST, "/api/tools/serp-preview")
            .json(request);
        self.send_json(builder).await
    }

    pub async fn check_plagiarism(&self, content: &str) -> Result<PlagiarismReport> {
        let builder = self
            .request(Method::POST, "/api/tools/plagiarism")
            .json(&ContentBody { content });
        self.send_json(builder).await
    }

    pub async fn analyze_competitors(&self, keyword: &str) -> Result<CompetitorReport> {
        let builder = self
            .request(Method::POST, "/api/tools/competitors")
            .json(&KeywordBody { keyword });
        self.send_json(builder).await
    }
}
