use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use fortress_console::chat::{ChatError, ChatInput, Conversation, Role};
use fortress_console::config::{AppConfig, LoggingConfig};
use fortress_console::dashboard::format::format_thousands;
use fortress_console::dashboard::overview::{key_status_points, stats_cards, weekly_points};
use fortress_console::dashboard::{
    classify_health, follow_job, overall_status, system_metrics, ApiKeyPanel, HeaderView, ModelHub, Notice,
    OverviewView, ProjectsPanel, SystemHealthView, UsageView, UsersPanel,
};
use fortress_console::models::{LoginRequest, VerifyResponse};
use fortress_console::session::{SessionContext, SessionGate, SessionStore};
use fortress_console::{ApiError, BackendClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "fortress", version, about = "Admin console and chat client for the Fortress AI backend")]
struct Cli {
    /// Config file (default: <config dir>/fortress-console/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in to a company account
    Login(Credentials),

    /// Create a company and its first admin user
    Signup(Credentials),

    /// End the session and forget the stored credential
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Live header, overview and system health until Ctrl-C
    Watch,

    /// Detailed system health
    Health,

    /// Overview counters and charts
    Stats,

    /// Traffic, latency and token usage
    Usage,

    #[command(subcommand)]
    Projects(ProjectCommand),

    #[command(subcommand)]
    Keys(KeyCommand),

    #[command(subcommand)]
    Users(UserCommand),

    #[command(subcommand)]
    Models(ModelCommand),

    /// Chat with the model using a project API key
    Chat {
        #[arg(long, env = "FORTRESS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

impl Commands {
    /// Dashboard route a protected command stands for.
    fn route(&self) -> Option<&'static str> {
        match self {
            Commands::Login(_) | Commands::Signup(_) | Commands::Logout | Commands::Chat { .. } => None,
            Commands::Whoami | Commands::Watch | Commands::Stats => Some("/dashboard"),
            Commands::Health => Some("/dashboard/system-health"),
            Commands::Usage => Some("/dashboard/usage"),
            Commands::Projects(_) => Some("/dashboard/projects"),
            Commands::Keys(_) => Some("/dashboard/api-keys"),
            Commands::Users(_) => Some("/dashboard/settings"),
            Commands::Models(_) => Some("/dashboard/models"),
        }
    }
}

/// The backend refused the stored session token mid-command.
#[derive(Debug, thiserror::Error)]
#[error("Session expired: {0}")]
struct SessionExpired(String);

fn is_session_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SessionExpired>().is_some()
        || err.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_expired)
}

#[derive(clap::Args, Debug)]
struct Credentials {
    #[arg(short, long)]
    company: String,
    #[arg(short, long)]
    username: String,
    /// Prompted for when omitted
    #[arg(long, env = "FORTRESS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    List,
    Create {
        name: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project together with its keys and usage
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    List {
        #[arg(short, long)]
        project: i64,
    },
    /// Create a key; the secret is printed once
    Create {
        #[arg(short, long)]
        project: i64,
        name: String,
    },
    Revoke {
        #[arg(short, long)]
        project: i64,
        id: i64,
    },
    Restore {
        #[arg(short, long)]
        project: i64,
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List,
    Create {
        username: String,
        #[arg(long, env = "FORTRESS_NEW_USER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    Curated {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    Downloaded,
    Download {
        repo_id: String,
        /// Poll the job until it finishes
        #[arg(long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&config.logging);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Console layer on stderr plus an optional daily-rotated file layer.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let (file_layer, guard) = if logging.file {
        let log_dir = AppConfig::log_dir();
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "fortress.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .init();

    guard
}

struct Console {
    config: AppConfig,
    client: BackendClient,
    store: SessionStore,
    session: SessionContext,
}

impl Console {
    async fn open(config: AppConfig) -> Result<Self> {
        let client = BackendClient::new(&config.backend).context("Failed to build HTTP client")?;
        let store = SessionStore::new(config.session_path());
        let session = store.load();
        client.use_session(&session).await;
        tracing::debug!("Backend at {}", client.base_url());

        Ok(Self {
            config,
            client,
            store,
            session,
        })
    }

    /// Runs the session gate for `route`; protected commands stop here when
    /// the backend does not confirm the session.
    async fn require_session(&self, route: &str) -> Result<VerifyResponse> {
        let gate = SessionGate::new(Arc::new(self.client.clone()));
        let state = gate.check(route).await;
        if let Some(session) = state.protected() {
            return Ok(session.clone());
        }
        match state.redirect() {
            Some(redirect) => bail!(
                "Not signed in: {} requires a session, sign in first (`fortress login`, {})",
                redirect.from,
                redirect.to
            ),
            None => bail!("Session check did not complete"),
        }
    }

    /// Forgets the stored session after a 401 and sends the user back to login.
    async fn expire(&self, route: &str, err: &anyhow::Error) -> Result<()> {
        tracing::warn!("Session rejected on {}: {:#}", route, err);
        self.client.clear_token().await;
        self.store.clear()?;
        bail!(
            "Session expired: {} requires a new sign-in (`fortress login`, /login)",
            route
        )
    }
}

async fn run(command: Commands, config: AppConfig) -> Result<()> {
    let mut console = Console::open(config).await?;
    let route = command.route();

    match dispatch(&mut console, command).await {
        Err(e) if is_session_expired(&e) => console.expire(route.unwrap_or("/dashboard"), &e).await,
        result => result,
    }
}

async fn dispatch(console: &mut Console, command: Commands) -> Result<()> {
    match command {
        Commands::Login(creds) => authenticate(console, creds, false).await,
        Commands::Signup(creds) => authenticate(console, creds, true).await,
        Commands::Logout => {
            if let Err(e) = console.client.logout().await {
                tracing::warn!("Server-side logout failed: {}", e);
            }
            console.store.clear()?;
            report(Notice::success("Logged out").with_description("You have been logged out successfully"))
        }
        Commands::Whoami => {
            let session = console.require_session("/dashboard").await?;
            println!("{} (user {}, company {})", session.user.username, session.user.id, session.company_id);
            if !console.session.company_name().is_empty() {
                println!("Company: {}", console.session.company_name());
            }
            Ok(())
        }
        Commands::Watch => {
            console.require_session("/dashboard").await?;
            watch(console).await
        }
        Commands::Health => {
            console.require_session("/dashboard/system-health").await?;
            show_health(&console.client).await
        }
        Commands::Stats => {
            console.require_session("/dashboard").await?;
            show_stats(&console.client).await
        }
        Commands::Usage => {
            console.require_session("/dashboard/usage").await?;
            show_usage(console).await
        }
        Commands::Projects(cmd) => {
            console.require_session("/dashboard/projects").await?;
            projects(&console.client, cmd).await
        }
        Commands::Keys(cmd) => {
            console.require_session("/dashboard/api-keys").await?;
            keys(&console.client, cmd).await
        }
        Commands::Users(cmd) => {
            console.require_session("/dashboard/settings").await?;
            users(&console.client, cmd).await
        }
        Commands::Models(cmd) => {
            console.require_session("/dashboard/models").await?;
            models(console, cmd).await
        }
        Commands::Chat { api_key } => chat(&console.client, api_key).await,
    }
}

fn report(notice: Notice) -> Result<()> {
    notice.log();
    if notice.is_session_expired() {
        return Err(SessionExpired(notice.description.unwrap_or(notice.title)).into());
    }
    if notice.is_error() {
        return Err(anyhow!(notice.to_string()));
    }
    println!("{}", notice);
    Ok(())
}

async fn prompt(label: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn authenticate(console: &mut Console, creds: Credentials, signup: bool) -> Result<()> {
    let password = match creds.password {
        Some(p) => p,
        None => prompt("Password: ").await?,
    };
    let request = LoginRequest {
        company: creds.company,
        username: creds.username,
        password,
    };

    let result = if signup {
        console.client.signup(&request).await
    } else {
        console.client.login(&request).await
    };
    let session = match result {
        Ok(session) => session,
        Err(e) => {
            let title = if signup { "Sign up failed" } else { "Login failed" };
            return report(Notice::error(title).with_description(e.detail()));
        }
    };

    console.store.save(&session)?;
    let welcome = format!("Welcome, {} ({})", session.username(), session.company_name());
    console.session = session;
    report(Notice::success(welcome))
}

async fn watch(console: &Console) -> Result<()> {
    let polling = &console.config.polling;
    let mut header = HeaderView::mount(&console.client, polling, &console.session)?;
    let mut overview = OverviewView::mount(&console.client, polling)?;
    let mut health = SystemHealthView::mount(&console.client, polling)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            alive = header.changed() => if !alive { break },
            alive = overview.changed() => if !alive { break },
            alive = health.changed() => if !alive { break },
        }
        if header.session_expired() || overview.session_expired() || health.session_expired() {
            return Err(SessionExpired("the backend refused the session token".into()).into());
        }
        render_watch(&header, &overview, &health);
    }

    tracing::info!("Stopped watching");
    Ok(())
}

fn render_watch(header: &HeaderView, overview: &OverviewView, health: &SystemHealthView) {
    let badge = header.badge();
    println!();
    println!("── {} · {} ── [{}] {}", header.company(), header.username(), badge.status, badge.label);

    for card in overview.stats_cards() {
        println!("  {:<16} {:>12}  {}", card.title, card.value, card.change);
    }
    if let Some(e) = overview.stats_error() {
        println!("  stats unavailable: {}", e);
    }

    let tiles: Vec<String> = overview
        .status_tiles()
        .iter()
        .map(|t| format!("{} {} ({})", t.name, t.status, t.subtitle))
        .collect();
    println!("  {}", tiles.join(" | "));

    let keys: Vec<String> = overview.key_status().iter().map(|p| format!("{} {}", p.label, p.value)).collect();
    let weekly: Vec<String> = overview
        .weekly_requests()
        .iter()
        .map(|p| format!("{} {}", p.label, p.value))
        .collect();
    println!("  keys: {}   week: {}", keys.join(", "), weekly.join(", "));
    if let Some(e) = overview.charts_error() {
        println!("  charts unavailable: {}", e);
    }

    for metric in health.metrics() {
        println!("  {:<14} {:>10}  {}", metric.name, metric.display, metric.status);
    }
    println!("  overall: {}", health.overall());
    if let Some(e) = health.error() {
        println!("  health unavailable: {}", e);
    }
}

async fn show_health(client: &BackendClient) -> Result<()> {
    let health = client.system_health().await?;
    let badge = classify_health(Some(&health));
    let metrics = system_metrics(Some(&health));

    println!("{} ({})", badge.label, badge.status);
    for metric in &metrics {
        println!("  {:<14} {:>10}  {}", metric.name, metric.display, metric.status);
    }
    println!("  Free memory    {:>7.1} GB", health.system.free_memory_gb);
    println!("  Database       {:>10}", if health.db_ok() { "OK" } else { "Down" });
    println!("Overall: {}", overall_status(&metrics));
    Ok(())
}

async fn show_stats(client: &BackendClient) -> Result<()> {
    let summary = client.stats_summary().await?;
    let now = chrono::Utc::now().timestamp();
    for card in stats_cards(Some(&summary), now) {
        println!("{:<16} {:>12}  {}", card.title, card.value, card.change);
    }

    match client.api_key_status().await {
        Ok(breakdown) => {
            for point in key_status_points(Some(&breakdown)) {
                println!("{:<16} {:>12}", format!("{} keys", point.label), point.value);
            }
        }
        Err(e) => println!("API key status unavailable: {}", e),
    }

    match client.project_status().await {
        Ok(p) => println!(
            "{:<16} {:>12}",
            "Projects",
            format!("{} active / {} paused / {} archived", p.active, p.paused, p.archived)
        ),
        Err(e) => println!("Project status unavailable: {}", e),
    }

    match client.weekly_requests().await {
        Ok(weekly) => {
            println!("Requests this week:");
            for point in weekly_points(Some(&weekly)) {
                println!("  {}  {:>8}", point.label, format_thousands(point.value));
            }
        }
        Err(e) => println!("Weekly requests unavailable: {}", e),
    }
    Ok(())
}

async fn show_usage(console: &Console) -> Result<()> {
    let mut usage = UsageView::mount(&console.client, &console.config.polling)?;
    while !usage.is_settled() {
        if !usage.changed().await {
            break;
        }
    }
    if usage.session_expired() {
        return Err(SessionExpired("the backend refused the session token".into()).into());
    }

    if let Some((total, peak)) = usage.traffic_summary() {
        println!(
            "Requests (24h): {}, peak {} at {}",
            format_thousands(total),
            format_thousands(peak.value),
            peak.label
        );
    }
    for point in usage.hourly_requests() {
        println!("  {}  {:>8}", point.label, format_thousands(point.value));
    }

    let buckets = usage.latency_buckets();
    if !buckets.is_empty() {
        println!("Latency:");
        for bucket in buckets {
            println!("  {:<12} {:>8}", bucket.label, format_thousands(bucket.value));
        }
    }

    if let Some(tokens) = usage.tokens().data {
        println!(
            "Tokens: {} total, error rate {:.2}%",
            format_thousands(tokens.total_tokens()),
            tokens.error_rate_percent()
        );
        for key in &tokens.keys {
            println!(
                "  {:<20} {:>12} tokens {:>8} requests {:>5} errors",
                key.key,
                format_thousands(key.tokens),
                format_thousands(key.requests),
                key.errors
            );
        }
    }

    for error in usage.errors() {
        println!("unavailable: {}", error);
    }
    Ok(())
}

async fn projects(client: &BackendClient, cmd: ProjectCommand) -> Result<()> {
    let mut panel = ProjectsPanel::new(client.clone());
    match cmd {
        ProjectCommand::List => {
            if let Err(notice) = panel.load().await {
                return report(notice);
            }
            for p in panel.projects() {
                println!(
                    "{:>5}  {:<24} {:<14} {:>3} keys  {}",
                    p.id,
                    p.name,
                    p.department.as_deref().unwrap_or("-"),
                    p.key_count,
                    p.created_date()
                );
            }
            Ok(())
        }
        ProjectCommand::Create {
            name,
            department,
            description,
        } => report(panel.create(&name, department.as_deref(), description.as_deref()).await),
        ProjectCommand::Delete { id } => report(panel.delete(id).await),
    }
}

async fn keys(client: &BackendClient, cmd: KeyCommand) -> Result<()> {
    match cmd {
        KeyCommand::List { project } => {
            let mut panel = ApiKeyPanel::new(client.clone(), project);
            if let Err(notice) = panel.load().await {
                return report(notice);
            }
            for row in panel.rows() {
                println!("{:>5}  {:<20} {}  {:<8} {}", row.id, row.name, row.masked(), row.status, row.created);
            }
            Ok(())
        }
        KeyCommand::Create { project, name } => {
            let mut panel = ApiKeyPanel::new(client.clone(), project);
            let notice = panel.create(&name).await;
            if !notice.is_error() {
                if let Some(secret) = panel.rows().last().and_then(|r| r.secret.as_deref()) {
                    println!("{}", secret);
                    println!("Store this key now; it will not be shown again.");
                }
            }
            report(notice)
        }
        KeyCommand::Revoke { project, id } => {
            let mut panel = ApiKeyPanel::new(client.clone(), project);
            report(panel.revoke(id).await)
        }
        KeyCommand::Restore { project, id } => {
            let mut panel = ApiKeyPanel::new(client.clone(), project);
            report(panel.restore(id).await)
        }
    }
}

async fn users(client: &BackendClient, cmd: UserCommand) -> Result<()> {
    let mut panel = UsersPanel::new(client.clone());
    match cmd {
        UserCommand::List => {
            if let Err(notice) = panel.load().await {
                return report(notice);
            }
            for user in panel.visible() {
                println!("{:>5}  {:<24} {}", user.id, user.username, user.created_at.as_deref().unwrap_or(""));
            }
            Ok(())
        }
        UserCommand::Create { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password for new user: ").await?,
            };
            report(panel.create(&username, &password).await)
        }
        UserCommand::Delete { id } => {
            if let Err(notice) = panel.load().await {
                return report(notice);
            }
            report(panel.delete(id).await)
        }
    }
}

async fn models(console: &Console, cmd: ModelCommand) -> Result<()> {
    let mut hub = ModelHub::new(console.client.clone());
    match cmd {
        ModelCommand::Curated { search } => {
            if let Err(notice) = hub.load_curated().await {
                return report(notice);
            }
            for model in hub.search(&search) {
                println!("{:<40} {:>8}  {}  [{}]", model.id, model.size, model.description, model.tags.join(", "));
            }
            Ok(())
        }
        ModelCommand::Downloaded => {
            if let Err(notice) = hub.load_downloaded().await {
                return report(notice);
            }
            for model in hub.downloaded() {
                println!("{:<40} {:>8}  {:<10} {}", model.name, model.size, model.status, model.downloaded_at);
            }
            Ok(())
        }
        ModelCommand::Download { repo_id, follow } => {
            let job_id = match hub.download(&repo_id).await {
                Ok(job_id) => job_id,
                Err(notice) => return report(notice),
            };
            println!("Job {} queued", job_id);
            if !follow {
                return Ok(());
            }

            let mut handle = hub.track(&job_id, console.config.polling.job())?;
            let job = tokio::select! {
                _ = tokio::signal::ctrl_c() => return Ok(()),
                job = follow_job(&mut handle, |j| println!("  {:?} {}%", j.status, j.percent)) => job,
            };
            match job {
                Ok(job) if job.error.is_none() => report(Notice::success(format!("{} downloaded", job.repo_id))),
                Ok(job) => report(
                    Notice::error("Download failed").with_description(job.error.unwrap_or_else(|| "unknown error".into())),
                ),
                Err(notice) => report(notice),
            }
        }
    }
}

async fn chat(client: &BackendClient, api_key: Option<String>) -> Result<()> {
    let mut conversation = Conversation::new(client.clone());
    if let Some(key) = api_key {
        conversation.set_api_key(key);
    }

    println!("Type a message, `/key <api key>` to set the key, `/quit` to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !conversation.has_api_key() {
            println!("Set your API key to get started.");
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::SetKey(key) => {
                conversation.set_api_key(key);
                if conversation.has_api_key() {
                    println!("API key set. You can now start chatting.");
                }
                continue;
            }
            ChatInput::Message(text) => text,
        };

        match conversation.send(text).await {
            Ok(reply) if reply.role == Role::Assistant => println!("{}", reply.content),
            Ok(_) => {}
            Err(ChatError::EmptyMessage) => {}
            Err(e @ ChatError::KeyRejected(_)) | Err(e @ ChatError::MissingApiKey) => {
                println!("{}", e);
                println!("Use `/key <api key>` to set a different key.");
            }
            Err(e) => {
                tracing::warn!("Generation failed: {}", e);
                println!("Error: {}", e);
            }
        }
    }
    Ok(())
}
