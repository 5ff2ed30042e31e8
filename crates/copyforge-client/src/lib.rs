//! # Copyforge API client
//!
//! Typed wrappers over every remote endpoint the Copyforge app talks to:
//! profile, draft generation, article CRUD, billing, the SEO toolkit, and
//! auth initiation. The client attaches the current bearer token on every
//! request and never caches responses; quota bookkeeping lives in
//! `copyforge-quota` and consumes this crate through the `ProfileSource`
//! trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use copyforge_client::{ApiClient, DraftRequest};
//! use copyforge_common::SessionProvider;
//!
//! struct EnvSession;
//!
//! impl SessionProvider for EnvSession {
//!     fn token(&self) -> Option<String> {
//!         std::env::var("COPYFORGE_TOKEN").ok()
//!     }
//!
//!     fn is_valid(&self) -> bool {
//!         self.token().is_some()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(
//!         "https://api.copyforge.app".to_string(),
//!         Arc::new(EnvSession),
//!     );
//!
//!     let article = client
//!         .generate_draft(DraftRequest {
//!             topic: "How to brew pour-over coffee".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     println!("{}", article.title);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use copyforge_common::{ProfileError, ProfileSnapshot, ProfileSource, SessionProvider};

mod articles;
mod tools;
mod types;

pub use copyforge_common::{Article, Plan};
pub use tools::*;
pub use types::*;

/// Fallback origin when no API URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.copyforge.app";

/// Word count sent on the one retry after the draft endpoint answers 404.
pub const FALLBACK_WORD_COUNT: u32 = 3000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-success response. `message` is the best text the body offered
    /// and is what the UI shows in its error banner.
    #[error("{message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// HTTP client for the Copyforge API.
///
/// Thread-safe; wrap it in an `Arc` to share across tasks. Authentication
/// is delegated to the injected [`SessionProvider`]: whatever token it
/// reports at send time goes out as a bearer header, and no token means an
/// anonymous request.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    pub fn new(base_url: String, session: Arc<dyn SessionProvider>) -> Self {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT)
    }

    /// Client with a custom request timeout. Draft generation waits on an
    /// LLM, so the default is deliberately generous.
    pub fn with_timeout(
        base_url: String,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, &url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    pub(crate) async fn send_unit(&self, builder: RequestBuilder) -> Result<()> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Fetch the authoritative profile: plan plus server-side usage counts.
    pub async fn get_profile(&self) -> Result<ProfileResponse> {
        self.send_json(self.request(Method::GET, "/api/profile"))
            .await
    }

    /// Generate an article draft.
    ///
    /// The backend rejects some word-count targets with a 404; that exact
    /// case gets a single retry at [`FALLBACK_WORD_COUNT`] words, reusing
    /// the same request id so the server can dedupe.
    pub async fn generate_draft(&self, mut request: DraftRequest) -> Result<Article> {
        let request_id = Uuid::new_v4().to_string();

        match self.post_draft(&request, &request_id).await {
            Ok(article) => Ok(article),
            Err(ApiError::Api { status: 404, .. }) => {
                warn!(
                    "Draft endpoint returned 404, retrying with {} words",
                    FALLBACK_WORD_COUNT
                );
                request.target_word_count = Some(FALLBACK_WORD_COUNT);
                self.post_draft(&request, &request_id).await
            }
            Err(err) => Err(err),
        }
    }

    async fn post_draft(&self, request: &DraftRequest, request_id: &str) -> Result<Article> {
        let builder = self
            .request(Method::POST, "/api/draft")
            .header("X-Request-Id", request_id)
            .json(request);
        self.send_json(builder).await
    }

    /// Start a Stripe checkout for the pro upgrade. The caller opens the
    /// returned URL in a browser.
    pub async fn create_checkout(&self) -> Result<BillingSession> {
        self.send_json(self.request(Method::POST, "/api/stripe/create-checkout"))
            .await
    }

    /// Open a Stripe billing-portal session for an existing subscriber.
    pub async fn billing_portal(&self) -> Result<BillingSession> {
        self.send_json(self.request(Method::POST, "/api/stripe/portal"))
            .await
    }

    /// Ask the backend to email a magic sign-in link.
    pub async fn request_magic_link(&self, email: &str) -> Result<()> {
        let builder = self
            .request(Method::POST, "/auth/magic-link")
            .json(&MagicLinkRequest {
                email: email.to_string(),
            });
        self.send_unit(builder).await
    }

    /// Fetch the Google OAuth redirect URL. The caller sends the browser
    /// there; everything after that is the auth service's business.
    pub async fn google_auth_url(&self) -> Result<String> {
        let redirect: AuthRedirect = self
            .send_json(self.request(Method::GET, "/auth/google"))
            .await?;
        Ok(redirect.url)
    }
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_profile(&self) -> std::result::Result<ProfileSnapshot, ProfileError> {
        if !self.session.is_valid() {
            return Err(ProfileError::Unauthenticated);
        }
        match self.get_profile().await {
            Ok(profile) => Ok(profile.into()),
            Err(ApiError::Api { status: 401, .. }) => Err(ProfileError::Unauthenticated),
            Err(err) => Err(ProfileError::Request(err.to_string())),
        }
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Api {
        status,
        message: extract_message(status, &body),
    }
}

/// Best-effort error text: a JSON `error` field, then a JSON `message`
/// field, then the raw body, then a generic status line.
fn extract_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed: {status}")
    } else {
        trimmed.to_string()
    }
}
