use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use interview_client::config::ConfigError;
use interview_client::net::transport::TransportError;
use interview_client::net::types::ProfileUpdate;
use interview_client::state::bootstrap::login_redirect;
use interview_client::storage::StorageError;
use interview_client::{ApiError, AppContext, ClientConfig, FileStorage, Navigator, SessionConfig, User};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("not signed in; run `interview-cli login` first")]
    NotSignedIn,
    #[error("no current interview session; pass a session id or run `session create`")]
    NoCurrentSession,
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "interview-cli", about = "Interview practice client")]
struct Cli {
    #[arg(long, env = "INTERVIEW_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "INTERVIEW_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signup(SignupArgs),
    Verify {
        code: String,
        #[arg(long, help = "Defaults to the email stashed by signup or login")]
        email: Option<String>,
    },
    Resend {
        #[arg(long)]
        email: Option<String>,
    },
    Login {
        email: String,
        #[arg(long, env = "INTERVIEW_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    Profile(ProfileArgs),
    Session(SessionCommand),
    Chat {
        message: String,
    },
    Speak {
        text: String,
        #[arg(long)]
        voice: Option<String>,
    },
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct SignupArgs {
    email: String,
    #[arg(long, env = "INTERVIEW_PASSWORD")]
    password: String,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long, help = "Saved to the profile once the email is verified")]
    role_preference: Option<String>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    role_preference: Option<String>,
    #[arg(long, help = "JSON object merged into profile preferences")]
    preferences: Option<String>,
}

#[derive(Args, Debug)]
struct SessionCommand {
    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Args, Debug, Clone)]
struct SessionConfigArgs {
    role: String,
    #[arg(long)]
    track: Option<String>,
    #[arg(long)]
    company_style: Option<String>,
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    interviewer: Option<String>,
}

impl From<SessionConfigArgs> for SessionConfig {
    fn from(args: SessionConfigArgs) -> Self {
        Self {
            role: args.role,
            track: args.track,
            company_style: args.company_style,
            difficulty: args.difficulty,
            interviewer_id: args.interviewer,
        }
    }
}

#[derive(Subcommand, Debug)]
enum SessionSubcommand {
    Create(SessionConfigArgs),
    List,
    Start { session_id: Option<String> },
    Send { content: String, #[arg(long)] session: Option<String> },
    Messages { session_id: Option<String> },
    Finalize { session_id: Option<String> },
    Results { session_id: Option<String> },
    /// Create a session and answer questions from stdin until it is done.
    Run(SessionConfigArgs),
    Discard,
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    SetToken { token: String },
    Status,
    /// Fetch the profile behind the admin credential.
    Whoami,
    Clear,
}

/// Stands in for the browser redirect when a credential is rejected.
struct ExpiredSessionNotice;

impl Navigator for ExpiredSessionNotice {
    fn navigate(&self, path: &str) {
        tracing::warn!(%path, "credentials rejected by the server");
        eprintln!("credentials rejected by the server; sign in again ({path})");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }

    tracing::debug!(base_url = %config.base_url, state_dir = %config.state_dir.display(), "client configured");
    let storage = Arc::new(FileStorage::open(&config.state_dir)?);
    let ctx = AppContext::new(config, storage, Arc::new(ExpiredSessionNotice))?;
    ctx.start().await;

    match cli.command {
        Command::Signup(args) => run_signup(&ctx, args).await,
        Command::Verify { code, email } => {
            let user = ctx.auth_flow.verify(email.as_deref(), &code).await?;
            println!("verified; signed in as {}", user.display_name());
            Ok(())
        }
        Command::Resend { email } => {
            let response = ctx.auth_flow.resend_verification(email.as_deref()).await?;
            println!("{}", response.message);
            Ok(())
        }
        Command::Login { email, password } => run_login(&ctx, &email, &password).await,
        Command::Logout => {
            ctx.auth_flow.logout();
            ctx.interview.discard();
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            require_signed_in(&ctx)?;
            let user = ctx.auth.user().ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
        Command::Profile(args) => run_profile(&ctx, args).await,
        Command::Session(session) => run_session(&ctx, session).await,
        Command::Chat { message } => {
            require_signed_in(&ctx)?;
            let reply = ctx.api.chat(&message).await?;
            println!("{}", reply.response);
            Ok(())
        }
        Command::Speak { text, voice } => {
            require_signed_in(&ctx)?;
            let clip = ctx.api.synthesize_speech(&text, voice.as_deref()).await?;
            print_json(&serde_json::json!({ "format": clip.format, "audio": clip.audio }))
        }
        Command::Admin(admin) => run_admin(&ctx, admin).await,
    }
}

async fn run_signup(ctx: &AppContext, args: SignupArgs) -> Result<(), CliError> {
    let preferences = ProfileUpdate {
        role_preference: args.role_preference,
        ..ProfileUpdate::default()
    };
    let response = ctx
        .auth_flow
        .signup(&args.email, &args.password, args.full_name.as_deref(), Some(preferences))
        .await?;
    println!("{}", response.message);
    println!("check {} for a code, then run `interview-cli verify <code>`", response.email);
    Ok(())
}

async fn run_login(ctx: &AppContext, email: &str, password: &str) -> Result<(), CliError> {
    match ctx.auth_flow.login(email, password).await {
        Ok(_) => {
            let name = ctx.auth.user().map_or_else(|| email.to_owned(), |u| u.display_name().to_owned());
            println!("signed in as {name}");
            Ok(())
        }
        Err(e) if e.is_forbidden() => {
            eprintln!("{e}");
            eprintln!("run `interview-cli verify <code>` or `interview-cli resend`");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_profile(ctx: &AppContext, args: ProfileArgs) -> Result<(), CliError> {
    require_signed_in(ctx)?;
    let preferences = args
        .preferences
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    let update = ProfileUpdate {
        full_name: args.full_name,
        role_preference: args.role_preference,
        preferences,
    };
    if update.is_empty() {
        let user = ctx.auth.user().ok_or(CliError::NotSignedIn)?;
        return print_json(&user);
    }
    let user = ctx.auth_flow.update_profile(&update).await?;
    print_json(&user)
}

async fn run_session(ctx: &AppContext, session: SessionCommand) -> Result<(), CliError> {
    if !matches!(session.command, SessionSubcommand::Discard) {
        require_signed_in(ctx)?;
    }
    let interview = &ctx.interview;

    match session.command {
        SessionSubcommand::Create(args) => {
            let session = interview.create_session(&args.into()).await?;
            print_json(&session)
        }
        SessionSubcommand::List => {
            let sessions = interview.list_sessions().await?;
            print_json(&sessions)
        }
        SessionSubcommand::Start { session_id } => {
            let id = session_or_current(ctx, session_id)?;
            let message = interview.start_session(&id).await?;
            println!("{}", message.content);
            Ok(())
        }
        SessionSubcommand::Send { content, session } => {
            let id = session_or_current(ctx, session)?;
            let reply = interview.send_message(&id, &content).await?;
            println!("{}", reply.content);
            print_stage(ctx);
            Ok(())
        }
        SessionSubcommand::Messages { session_id } => {
            let id = session_or_current(ctx, session_id)?;
            let messages = interview.refresh_messages(&id).await?;
            print_json(&messages)
        }
        SessionSubcommand::Finalize { session_id } => {
            let id = session_or_current(ctx, session_id)?;
            let evaluation = interview.finalize_session(&id).await?;
            print_json(&evaluation)
        }
        SessionSubcommand::Results { session_id } => {
            let id = session_or_current(ctx, session_id)?;
            let evaluation = interview.load_results(&id).await?;
            print_json(&evaluation)
        }
        SessionSubcommand::Run(args) => run_interview(ctx, args.into()).await,
        SessionSubcommand::Discard => {
            interview.discard();
            Ok(())
        }
    }
}

async fn run_interview(ctx: &AppContext, config: SessionConfig) -> Result<(), CliError> {
    let interview = &ctx.interview;
    let session = interview.create_session(&config).await?;
    eprintln!("session {} started ({})", session.id, session.stage);

    let opening = interview.start_session(&session.id).await?;
    println!("interviewer: {}", opening.content);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !interview.store().snapshot().is_finished() {
        let Some(line) = lines.next_line().await? else {
            eprintln!("input closed; session left open");
            return Ok(());
        };
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        if answer == "/quit" {
            eprintln!("session left open; resume with `session send`");
            return Ok(());
        }
        let reply = interview.send_message(&session.id, answer).await?;
        println!("interviewer: {}", reply.content);
        print_stage(ctx);
    }

    let evaluation = interview.finalize_session(&session.id).await?;
    print_json(&evaluation)
}

async fn run_admin(ctx: &AppContext, admin: AdminCommand) -> Result<(), CliError> {
    match admin.command {
        AdminSubcommand::SetToken { token } => ctx.admin.set_token(&token),
        AdminSubcommand::Status => {
            let status = if ctx.admin.is_signed_in() { "signed in" } else { "signed out" };
            println!("admin: {status}");
        }
        AdminSubcommand::Whoami => {
            if !ctx.admin.is_signed_in() {
                return Err(CliError::NotSignedIn);
            }
            let user: User = ctx.admin_client().get("/users/me").await?;
            return print_json(&user);
        }
        AdminSubcommand::Clear => ctx.admin.clear(),
    }
    Ok(())
}

fn require_signed_in(ctx: &AppContext) -> Result<(), CliError> {
    match login_redirect(ctx.bootstrapper.view()) {
        Some(_) => Err(CliError::NotSignedIn),
        None => Ok(()),
    }
}

fn session_or_current(ctx: &AppContext, session_id: Option<String>) -> Result<String, CliError> {
    session_id
        .or_else(|| ctx.interview.store().current_id())
        .ok_or(CliError::NoCurrentSession)
}

fn print_stage(ctx: &AppContext) {
    if let Some(stage) = ctx.interview.store().snapshot().stage() {
        eprintln!("[stage: {stage}]");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
