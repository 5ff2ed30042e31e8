//! Copyforge API Client Demo
//!
//! Walks through the main client surface:
//! - Profile lookup
//! - Draft generation (word-count fallback is handled inside the client)
//! - Article listing
//! - An SEO tool call
//!
//! Point it at a running backend with COPYFORGE_API_URL and put a bearer
//! token in COPYFORGE_TOKEN.

use std::sync::Arc;

use copyforge_client::{ApiClient, DraftRequest, DEFAULT_BASE_URL};
use copyforge_common::SessionProvider;

struct EnvSession;

impl SessionProvider for EnvSession {
    fn token(&self) -> Option<String> {
        std::env::var("COPYFORGE_TOKEN").ok()
    }

    fn is_valid(&self) -> bool {
        self.token().is_some()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url =
        std::env::var("COPYFORGE_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = ApiClient::new(base_url, Arc::new(EnvSession));

    println!("Copyforge client demo against {}", client.base_url());

    // 1. Profile
    println!("\n1. Fetching profile...");
    let profile = client.get_profile().await?;
    println!(
        "Plan: {} ({} generated today, {} this week)",
        profile.plan, profile.usage.today.generations, profile.usage.week.generations
    );

    // 2. Draft generation
    println!("\n2. Generating a draft...");
    let article = client
        .generate_draft(DraftRequest {
            topic: "How to brew pour-over coffee".to_string(),
            tone: Some("friendly".to_string()),
            target_word_count: Some(800),
            ..Default::default()
        })
        .await?;
    println!("Draft {}: {}", article.id, article.title);

    // 3. Article listing
    println!("\n3. Listing articles...");
    let articles = client.list_articles().await?;
    println!("{} articles on the account", articles.len());
    for entry in articles.iter().take(5) {
        println!("  - {} ({})", entry.title, entry.id);
    }

    // 4. SEO tooling
    println!("\n4. Readability check...");
    let report = client.readability(&article.content).await?;
    println!(
        "Score {:.1}, {} words, reads at {}",
        report.score, report.word_count, report.grade_level
    );
    for suggestion in &report.suggestions {
        println!("  - {}", suggestion);
    }

    Ok(())
}
