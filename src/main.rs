mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::create::TaskArgs;
use tasktrack::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "ttt",
    version,
    about = "Team task tracker: terminal client and web dashboard for the task API"
)]
struct Cli {
    /// Config file (default: <config dir>/tasktrack/config.toml)
    #[arg(long, env = "TTT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the task API
    #[arg(long, env = "TTT_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Rows per page in paginated lists (1-100)
    #[arg(long, env = "TTT_PAGE_SIZE")]
    page_size: Option<u32>,

    /// Reference time zone for timestamps (IANA name)
    #[arg(long, env = "TTT_TIME_ZONE")]
    time_zone: Option<String>,

    /// Where the terminal session token is kept
    #[arg(long, env = "TTT_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Output as JSON instead of table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and save the session token
    Login {
        #[arg(short, long)]
        email: String,
        /// Password (prompted on stdin when omitted)
        #[arg(short, long, env = "TTT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// List tasks
    List {
        /// Filter by status (not_started, in_progress, completed, all)
        #[arg(short, long)]
        status: Option<String>,
        /// Search title, description and assignee
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Show only the N most recent tasks instead of a page
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show a task and its activity log
    Show {
        /// Task ID
        id: String,
    },
    /// Create a new task
    Create {
        /// Task title
        title: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Add an activity entry to a task
    Log {
        /// Task ID
        id: String,
        /// What happened
        event: String,
        /// Optional detail
        #[arg(short, long)]
        detail: Option<String>,
    },
    /// Show task counts, work in progress and recent tasks
    Summary,
    /// Serve the web dashboard
    Serve {
        /// Address to bind (default: 127.0.0.1:3000)
        #[arg(long, env = "TTT_BIND")]
        bind: Option<String>,
    },
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Task description
    #[arg(short, long)]
    description: Option<String>,
    /// Assignee name
    #[arg(short, long)]
    assignee: Option<String>,
    /// Status (not_started, in_progress, completed)
    #[arg(short, long)]
    status: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    due: Option<String>,
    /// Completion time (YYYY-MM-DDTHH:MM in the reference zone)
    #[arg(long)]
    completed_at: Option<String>,
}

impl FieldArgs {
    fn task_args<'a>(&'a self, title: Option<&'a str>) -> TaskArgs<'a> {
        TaskArgs {
            title,
            description: self.description.as_deref(),
            assignee: self.assignee.as_deref(),
            status: self.status.as_deref(),
            start: self.start.as_deref(),
            due: self.due.as_deref(),
            completed_at: self.completed_at.as_deref(),
        }
    }
}

fn init_tracing(serving: bool) {
    let default = if serving { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let bind_addr = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };
    let overrides = Overrides {
        api_base_url: cli.api_base_url,
        bind_addr,
        page_size: cli.page_size,
        time_zone: cli.time_zone,
        session_file: cli.session_file,
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides).map_err(|e| e.to_string())?;
    let json = cli.json;

    match cli.command {
        Commands::Login { email, password } => {
            commands::login::run(&config, &email, password.as_deref()).await
        }
        Commands::Logout => commands::logout::run(&config),
        Commands::List {
            status,
            search,
            page,
            limit,
        } => {
            commands::list::run(
                &config,
                status.as_deref(),
                search.as_deref(),
                page,
                limit,
                json,
            )
            .await
        }
        Commands::Show { id } => commands::show::run(&config, &id, json).await,
        Commands::Create { title, fields } => {
            commands::create::run(&config, &fields.task_args(Some(title.as_str())), json).await
        }
        Commands::Update { id, title, fields } => {
            commands::update::run(&config, &id, &fields.task_args(title.as_deref()), json).await
        }
        Commands::Delete { id, yes } => commands::delete::run(&config, &id, yes).await,
        Commands::Log { id, event, detail } => {
            commands::log::run(&config, &id, &event, detail.as_deref(), json).await
        }
        Commands::Summary => commands::summary::run(&config, json).await,
        Commands::Serve { .. } => tasktrack::web::serve(config).await,
    }
}
