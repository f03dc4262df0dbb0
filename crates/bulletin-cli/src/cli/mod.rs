//! CLI entry and dispatch.

use anyhow::{Context, Result};
use bulletin_core::api::build_http_client;
use bulletin_core::config::Config;
use bulletin_core::{ApiClient, Credentials, logging};
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "bulletin")]
#[command(version)]
#[command(about = "Live newsletter feed in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Connection overrides for commands that talk to the service.
#[derive(clap::Args, Debug, Clone, Default)]
struct ConnectionArgs {
    /// Newsletter service URL (BULLETIN_BASE_URL takes precedence)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Override the configured username
    #[arg(long, global = true)]
    username: Option<String>,

    /// Override the configured password
    #[arg(long, global = true)]
    password: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Follow the live feed (default)
    Watch,
    /// List all newsletters
    List,
    /// Create a newsletter
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
    },
    /// Update a newsletter
    Update {
        #[arg(value_name = "ID")]
        id: i64,
        #[arg(value_name = "TITLE")]
        title: String,
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the service URL in the config file
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

/// Resolved connection settings shared by the network commands.
pub struct Session {
    pub config: Config,
    pub base_url: String,
    pub credentials: Credentials,
}

impl Session {
    fn resolve(config: Config, args: &ConnectionArgs) -> Result<Self> {
        let base_url = config.resolve_base_url(args.base_url.as_deref())?;
        let mut credentials = config.credentials();
        if let Some(username) = &args.username {
            credentials.username.clone_from(username);
        }
        if let Some(password) = &args.password {
            credentials.password.clone_from(password);
        }
        Ok(Self {
            config,
            base_url,
            credentials,
        })
    }

    pub fn http(&self) -> Result<reqwest::Client> {
        build_http_client(self.config.connect_timeout())
    }

    pub fn api(&self, http: reqwest::Client) -> ApiClient {
        ApiClient::new(self.base_url.clone(), http)
    }

    pub fn events_url(&self) -> String {
        self.config.events_url(&self.base_url)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config).context("init logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let Cli {
        command,
        connection,
    } = cli;

    // default to watch mode
    match command.unwrap_or(Commands::Watch) {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
        Commands::Watch => {
            let session = Session::resolve(config, &connection)?;
            commands::watch::run(&session).await
        }
        Commands::List => {
            let session = Session::resolve(config, &connection)?;
            commands::newsletters::list(&session).await
        }
        Commands::Create { title, content } => {
            let session = Session::resolve(config, &connection)?;
            commands::newsletters::create(&session, &title, &content).await
        }
        Commands::Update { id, title, content } => {
            let session = Session::resolve(config, &connection)?;
            commands::newsletters::update(&session, id, &title, &content).await
        }
    }
}
