mod session;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use copyforge_client::{
    ApiClient, ArticleUpdate, DraftRequest, MetaDescriptionRequest, NewArticle,
    SerpPreviewRequest, DEFAULT_BASE_URL,
};
use copyforge_quota::{
    DenialReason, EngagementPrompt, FileStorage, GateDecision, QuotaContext, QuotaState,
    QuotaStore, Storage,
};
use session::{Anonymous, FileSession};
use tracing::warn;

#[derive(Parser)]
#[command(name = "copyforge")]
#[command(version, about = "Write and optimize articles from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and out
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Show the account profile as reported by the backend
    Profile,
    /// Pull authoritative usage counts from the backend
    Sync,
    /// Inspect or follow the local quota state
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },
    /// Generate an article draft
    Generate(GenerateArgs),
    /// Manage saved articles
    Articles {
        #[command(subcommand)]
        action: ArticleAction,
    },
    /// Run an SEO tool
    Tools {
        #[command(subcommand)]
        tool: ToolCommand,
    },
    /// Subscription management
    Billing {
        #[command(subcommand)]
        action: BillingAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Request a magic sign-in link by email
    Login { email: String },
    /// Print the Google sign-in URL
    Google,
    /// Store a bearer token obtained from a completed sign-in
    Token {
        token: String,
        /// Token expiry, RFC 3339
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Forget the stored credential
    Logout,
}

#[derive(Subcommand)]
enum QuotaAction {
    /// Print the current quota state
    Status,
    /// Keep running and print the state every time it changes
    Watch,
}

#[derive(Args)]
struct GenerateArgs {
    /// What the article should be about
    topic: String,
    /// Writing tone, e.g. friendly or formal
    #[arg(long)]
    tone: Option<String>,
    /// Output language code, e.g. en or de
    #[arg(long)]
    language: Option<String>,
    /// Target length in words
    #[arg(long)]
    words: Option<u32>,
    /// Ask the backend to include stock images
    #[arg(long)]
    images: bool,
    /// Append a generated FAQ section
    #[arg(long)]
    faq: bool,
}

#[derive(Subcommand)]
enum ArticleAction {
    /// List saved articles
    List,
    /// Print one article
    Get { id: String },
    /// Save a new article
    Create {
        #[arg(long)]
        title: String,
        /// Article body; pass - to read from stdin
        #[arg(long)]
        content: String,
        #[arg(long)]
        topic: Option<String>,
    },
    /// Change an article's title or body
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New body; pass - to read from stdin
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete an article
    Delete { id: String },
}

#[derive(Subcommand)]
enum ToolCommand {
    /// Suggest SEO meta descriptions for a topic
    MetaDescription {
        topic: String,
        /// Comma-separated keywords to work in
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
    },
    /// Score how easy a text is to read; pass - to read stdin
    Readability { text: String },
    /// Extract ranked keywords from a text; pass - to read stdin
    Keywords { text: String },
    /// Score a headline
    Headline { headline: String },
    /// Preview how a page renders in search results
    SerpPreview {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        url: String,
    },
    /// Check a text for duplicated content; pass - to read stdin
    Plagiarism { text: String },
    /// Summarize the top-ranking pages for a keyword
    Competitors { keyword: String },
}

#[derive(Subcommand)]
enum BillingAction {
    /// Start a pro checkout and print the payment link
    Upgrade,
    /// Print the subscription management link
    Portal,
    /// Process the URL the browser landed on after checkout
    Confirm { redirect_url: String },
}

struct Settings {
    api_url: String,
    data_dir: PathBuf,
}

impl Settings {
    fn from_env() -> Result<Self> {
        let api_url =
            std::env::var("COPYFORGE_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let data_dir = match std::env::var_os("COPYFORGE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .context("Could not determine a data directory for this platform")?
                .join("copyforge"),
        };
        Ok(Self { api_url, data_dir })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let mut session = FileSession::load(&settings.data_dir);

    match cli.command {
        Commands::Auth { action } => run_auth(action, &mut session, &settings).await,
        command => run_command(command, &settings, session).await,
    }
}

async fn run_command(command: Commands, settings: &Settings, session: FileSession) -> Result<()> {
    let session = Arc::new(session);
    let api = Arc::new(ApiClient::new(settings.api_url.clone(), session.clone()));
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(settings.data_dir.join("state")));
    let store = QuotaStore::new(storage.clone());
    let ctx = QuotaContext::initialize(store, api.clone(), session.as_ref()).await;

    match command {
        // Auth is dispatched before the service context is built.
        Commands::Auth { .. } => Ok(()),
        Commands::Profile => run_profile(&api).await,
        Commands::Sync => run_sync(&ctx).await,
        Commands::Quota { action } => match action {
            QuotaAction::Status => {
                print_status(&ctx.snapshot());
                Ok(())
            }
            QuotaAction::Watch => run_quota_watch(&ctx).await,
        },
        Commands::Generate(args) => run_generate(args, &api, &ctx, &storage).await,
        Commands::Articles { action } => run_articles(action, &api).await,
        Commands::Tools { tool } => run_tool(tool, &api, &ctx, &storage).await,
        Commands::Billing { action } => run_billing(action, &api, &ctx).await,
    }
}

async fn run_auth(
    action: AuthAction,
    session: &mut FileSession,
    settings: &Settings,
) -> Result<()> {
    match action {
        AuthAction::Login { email } => {
            let api = anon_client(settings);
            api.request_magic_link(&email).await?;
            println!("Magic link sent to {email}.");
            println!("Open it in your browser, then store the token with:");
            println!("  copyforge auth token <token>");
        }
        AuthAction::Google => {
            let api = anon_client(settings);
            let url = api.google_auth_url().await?;
            println!("Sign in with Google:");
            println!("  {url}");
            println!("Afterwards store the token with `copyforge auth token <token>`.");
        }
        AuthAction::Token { token, expires_at } => {
            session.store(token, expires_at)?;
            println!("Signed in. Run `copyforge sync` to pull your plan.");
        }
        AuthAction::Logout => {
            session.clear()?;
            println!("Signed out. Local quota state is kept.");
        }
    }
    Ok(())
}

fn anon_client(settings: &Settings) -> ApiClient {
    ApiClient::new(settings.api_url.clone(), Arc::new(Anonymous))
}

async fn run_profile(api: &ApiClient) -> Result<()> {
    let profile = api.get_profile().await?;
    if let Some(email) = &profile.email {
        println!("Account: {email}");
    }
    println!("Plan: {}", profile.plan);
    println!("Generated today: {}", profile.usage.today.generations);
    println!("Generated this week: {}", profile.usage.week.generations);
    println!("Tools used today: {}", profile.tools_today);
    Ok(())
}

async fn run_sync(ctx: &QuotaContext) -> Result<()> {
    if !ctx.is_authenticated() {
        println!("Not signed in; nothing to sync.");
        return Ok(());
    }
    ctx.sync_with_backend().await?;
    print_status(&ctx.snapshot());
    Ok(())
}

fn print_status(state: &QuotaState) {
    let quota = &state.quota;
    println!("Plan: {}", quota.plan);
    println!(
        "Signed in: {}",
        if state.is_authenticated { "yes" } else { "no" }
    );
    println!(
        "Articles: {} today, {} this week",
        quota.today_generations, quota.week_generations
    );
    println!(
        "Tool uses: {} today, {} this week",
        quota.tools_today, quota.week_tools
    );
    println!("Remaining: {}", quota.remaining_quota_label());
    if quota.demo_used && !state.is_authenticated {
        match quota.demo_used_at {
            Some(at) => println!("Demo article used on {}", at.date_naive()),
            None => println!("Demo article used"),
        }
    }
}

async fn run_quota_watch(ctx: &Arc<QuotaContext>) -> Result<()> {
    let _sync = ctx.start_auto_sync();
    let mut state_rx = ctx.subscribe();

    println!("Watching quota state, Ctrl-C to stop.");
    print_status(&state_rx.borrow().clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                let state = state_rx.borrow().clone();
                print_status(&state);
            }
        }
    }
    Ok(())
}

async fn run_generate(
    args: GenerateArgs,
    api: &ApiClient,
    ctx: &QuotaContext,
    storage: &Arc<dyn Storage>,
) -> Result<()> {
    if let GateDecision::Denied(reason) = ctx.check_article_gate() {
        print_denial(&reason);
        offer_signup(ctx, storage);
        return Ok(());
    }

    let request = DraftRequest {
        topic: args.topic,
        tone: args.tone,
        language: args.language,
        target_word_count: args.words,
        include_images: args.images,
        include_faq: args.faq,
    };
    let article = api.generate_draft(request).await?;
    ctx.record_article_generation()?;

    println!("# {}", article.title);
    println!();
    println!("{}", article.content);
    println!();
    println!("Saved as article {}.", article.id);
    println!("{}", ctx.snapshot().quota.remaining_quota_label());
    Ok(())
}

async fn run_articles(action: ArticleAction, api: &ApiClient) -> Result<()> {
    match action {
        ArticleAction::List => {
            let articles = api.list_articles().await?;
            if articles.is_empty() {
                println!("No articles yet.");
                return Ok(());
            }
            for article in &articles {
                match &article.updated_at {
                    Some(updated) => println!(
                        "{}  {}  (updated {})",
                        article.id,
                        article.title,
                        updated.date_naive()
                    ),
                    None => println!("{}  {}", article.id, article.title),
                }
            }
        }
        ArticleAction::Get { id } => {
            let article = api.get_article(&id).await?;
            println!("# {}", article.title);
            println!();
            println!("{}", article.content);
        }
        ArticleAction::Create {
            title,
            content,
            topic,
        } => {
            let content = read_input(&content)?;
            let article = api
                .create_article(&NewArticle {
                    title,
                    content,
                    topic,
                    ..Default::default()
                })
                .await?;
            println!("Created article {}.", article.id);
        }
        ArticleAction::Update { id, title, content } => {
            let content = content.as_deref().map(read_input).transpose()?;
            api.update_article(&id, &ArticleUpdate { title, content })
                .await?;
            println!("Updated article {id}.");
        }
        ArticleAction::Delete { id } => {
            api.delete_article(&id).await?;
            println!("Deleted article {id}.");
        }
    }
    Ok(())
}

async fn run_tool(
    tool: ToolCommand,
    api: &ApiClient,
    ctx: &QuotaContext,
    storage: &Arc<dyn Storage>,
) -> Result<()> {
    if let GateDecision::Denied(reason) = ctx.check_tool_gate() {
        print_denial(&reason);
        offer_signup(ctx, storage);
        return Ok(());
    }

    match tool {
        ToolCommand::MetaDescription { topic, keywords } => {
            let request = MetaDescriptionRequest {
                topic,
                keywords: if keywords.is_empty() {
                    None
                } else {
                    Some(keywords)
                },
            };
            let response = api.meta_description(&request).await?;
            for (index, description) in response.descriptions.iter().enumerate() {
                println!("{}. {}", index + 1, description);
            }
        }
        ToolCommand::Readability { text } => {
            let text = read_input(&text)?;
            let report = api.readability(&text).await?;
            println!("Score: {:.1}", report.score);
            println!("Grade level: {}", report.grade_level);
            println!("Words: {}", report.word_count);
            for suggestion in &report.suggestions {
                println!("- {}", suggestion);
            }
        }
        ToolCommand::Keywords { text } => {
            let text = read_input(&text)?;
            let report = api.extract_keywords(&text).await?;
            for entry in &report.keywords {
                println!("{:.2}  {}", entry.score, entry.keyword);
            }
        }
        ToolCommand::Headline { headline } => {
            let analysis = api.analyze_headline(&headline).await?;
            println!("Score: {}", analysis.score);
            println!("Sentiment: {}", analysis.sentiment);
            for suggestion in &analysis.suggestions {
                println!("- {}", suggestion);
            }
        }
        ToolCommand::SerpPreview {
            title,
            description,
            url,
        } => {
            let preview = api
                .serp_preview(&SerpPreviewRequest {
                    title,
                    description,
                    url,
                })
                .await?;
            println!("{}", preview.title);
            println!("{}", preview.display_url);
            println!("{}", preview.description);
        }
        ToolCommand::Plagiarism { text } => {
            let text = read_input(&text)?;
            let report = api.check_plagiarism(&text).await?;
            println!("Originality: {:.0}%", report.originality * 100.0);
            for found in &report.matches {
                println!("{:.0}%  {}", found.similarity * 100.0, found.source);
            }
        }
        ToolCommand::Competitors { keyword } => {
            let report = api.analyze_competitors(&keyword).await?;
            for entry in &report.competitors {
                println!("{}  {} ({} words)", entry.url, entry.title, entry.word_count);
            }
        }
    }

    ctx.record_tool_usage()?;
    Ok(())
}

async fn run_billing(action: BillingAction, api: &ApiClient, ctx: &QuotaContext) -> Result<()> {
    match action {
        BillingAction::Upgrade => {
            let session = api.create_checkout().await?;
            println!("Open this link to upgrade:");
            println!("  {}", session.url);
            println!("When the browser lands back on the site, run:");
            println!("  copyforge billing confirm <that URL>");
        }
        BillingAction::Portal => {
            let session = api.billing_portal().await?;
            println!("Manage your subscription here:");
            println!("  {}", session.url);
        }
        BillingAction::Confirm { redirect_url } => {
            if ctx.handle_checkout_return(&redirect_url).await? {
                println!(
                    "Upgrade confirmed. You are on the {} plan.",
                    ctx.snapshot().quota.plan
                );
            } else {
                println!("That URL does not look like a completed checkout.");
            }
        }
    }
    Ok(())
}

/// Show why the action was refused, with the upgrade hint when one applies.
fn print_denial(reason: &DenialReason) {
    println!("{}", reason);
    if let Some(hint) = upgrade_hint(reason) {
        println!("{hint}");
    }
}

/// Call-to-action for denials a plan change would lift; signed-out denials
/// get the signup nudge instead.
fn upgrade_hint(reason: &DenialReason) -> Option<&'static str> {
    reason
        .upgrade_lifts_limit()
        .then_some("Upgrade for higher limits with `copyforge billing upgrade`.")
}

/// Show the sign-up nudge to signed-out users, at most once per cooldown.
fn offer_signup(ctx: &QuotaContext, storage: &Arc<dyn Storage>) {
    if ctx.is_authenticated() {
        return;
    }
    let prompt = EngagementPrompt::new(Arc::clone(storage));
    let now = Utc::now();
    if prompt.should_show(now) {
        println!();
        println!("Create a free account to keep writing: https://copyforge.app/signup");
        if let Err(err) = prompt.mark_shown(now) {
            warn!("Could not record the prompt cooldown: {}", err);
        }
    }
}

/// CLI text arguments accept - to mean "read stdin".
fn read_input(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("read stdin")?;
    Ok(buffer)
}
