
mod storage;
mod transport;

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use coursehub_client::config::{ClientConfig, ConfigError};
use coursehub_client::context::AppServices;
use coursehub_client::error::ClientError;
use coursehub_client::net::types::AiQuestion;
use coursehub_client::util::clock::SystemClock;
use serde_json::{Value, json};
use tracing::Level;

use crate::storage::FileStorage;
use crate::transport::ReqwestTransport;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing password; pass --password or set COURSEHUB_PASSWORD")]
    MissingPassword,
    #[error("not signed in; run `coursehub login` first")]
    NotSignedIn,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "coursehub", about = "CourseHub session and catalog CLI")]
struct Cli {
    /// File holding the persisted session tokens.
    #[arg(long, global = true, env = "COURSEHUB_STATE_FILE", default_value = ".coursehub-session.json")]
    state_file: PathBuf,

    #[arg(long, global = true, env = "COURSEHUB_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Log requests and session transitions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with the password grant and persist the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "COURSEHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// Exchange the refresh token for a new access token.
    Refresh,
    /// Show what the route guard decides for a path.
    Authorize {
        path: String,
    },
    Courses(CoursesCommand),
    Videos {
        course_id: i64,
    },
    Ask {
        question: String,
        #[arg(long)]
        course_id: Option<String>,
    },
    /// Check that the AI assistant is reachable.
    AiHealth,
    /// GET an arbitrary URL with the session's bearer token.
    Get {
        url: String,
    },
}

#[derive(Args, Debug)]
struct CoursesCommand {
    #[command(subcommand)]
    command: CoursesSubcommand,
}

#[derive(Subcommand, Debug)]
enum CoursesSubcommand {
    List,
    Show { id: i64 },
    Search { keyword: String },
    Category { name: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let services = build_services(&cli)?;
    run(&services, cli.command).await
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

fn build_services(cli: &Cli) -> Result<AppServices, CliError> {
    let config = ClientConfig::from_lookup(|key| std::env::var(key).ok())?;
    tracing::debug!(
        backend = ?config.backend,
        token_endpoint = %config.idp.token_endpoint(),
        state_file = %cli.state_file.display(),
        "configured"
    );
    let storage = FileStorage::open(&cli.state_file);
    let transport = ReqwestTransport::new(Duration::from_secs(cli.timeout_secs))?;
    Ok(AppServices::build(config, Rc::new(storage), Rc::new(transport), Rc::new(SystemClock)))
}

async fn run(services: &AppServices, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username, password } => {
            let password = password.ok_or(CliError::MissingPassword)?;
            let session = services.session.login(&username, &password).await?;
            print_json(&json!({
                "signedIn": true,
                "username": session.user.as_ref().map_or(username.as_str(), |u| u.username.as_str()),
                "expiresAt": session.expires_at,
            }))
        }
        Command::Logout => {
            services.session.logout();
            print_json(&json!({ "signedIn": false }))
        }
        Command::Whoami => whoami(services).await,
        Command::Refresh => {
            restore(services).await?;
            services.session.refresh().await?;
            print_json(&json!({ "refreshed": true, "expiresAt": services.session.session().expires_at }))
        }
        Command::Authorize { path } => {
            services.session.restore().await;
            let decision = services.authorize(&path);
            print_json(&json!({
                "path": path,
                "allow": decision.allow,
                "redirectTo": decision.redirect_to,
            }))
        }
        Command::Courses(courses) => run_courses(services, courses).await,
        Command::Videos { course_id } => {
            services.session.restore().await;
            let videos = services.backend.course_videos(course_id).await?;
            print_json(&serde_json::to_value(videos)?)
        }
        Command::Ask { question, course_id } => {
            restore(services).await?;
            let answer = services
                .backend
                .ask(AiQuestion { question, course_id, ..AiQuestion::default() })
                .await?;
            print_json(&serde_json::to_value(answer)?)
        }
        Command::AiHealth => {
            services.session.restore().await;
            print_json(&json!({ "up": services.backend.ai_health().await }))
        }
        Command::Get { url } => {
            services.session.restore().await;
            let value: Value = services.api.get_json(&url).await?;
            print_json(&value)
        }
    }
}

async fn run_courses(services: &AppServices, courses: CoursesCommand) -> Result<(), CliError> {
    // The catalog is public; a stored session only adds the bearer header.
    services.session.restore().await;
    let value = match courses.command {
        CoursesSubcommand::List => serde_json::to_value(services.backend.list_courses().await?)?,
        CoursesSubcommand::Show { id } => serde_json::to_value(services.backend.course(id).await?)?,
        CoursesSubcommand::Search { keyword } => serde_json::to_value(services.backend.search_courses(&keyword).await?)?,
        CoursesSubcommand::Category { name } => serde_json::to_value(services.backend.courses_by_category(&name).await?)?,
    };
    print_json(&value)
}

async fn whoami(services: &AppServices) -> Result<(), CliError> {
    restore(services).await?;
    let session = services.session.session();
    let user = match session.user.clone() {
        Some(user) => Some(user),
        None => match services.session.reload_profile().await {
            Ok(user) => Some(user),
            Err(e) if e.clears_session() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "profile unavailable");
                None
            }
        },
    };
    print_json(&json!({
        "username": user.as_ref().map(|u| u.username.clone()),
        "displayName": user.as_ref().map(coursehub_client::state::session::UserProfile::display_name),
        "email": user.as_ref().map(|u| u.email.clone()),
        "roles": services.session.session().roles(),
        "expiresAt": session.expires_at,
    }))
}

/// Adopt the persisted session; commands that need one fail when it is gone.
async fn restore(services: &AppServices) -> Result<(), CliError> {
    services.session.restore().await;
    if services.session.is_authenticated() { Ok(()) } else { Err(CliError::NotSignedIn) }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
