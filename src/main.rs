use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use goxxx::application::errors::BotError;
use goxxx::application::messaging::{MessageDispatcher, ReplyThrottle};
use goxxx::application::services::{BotService, MembershipTracker};
use goxxx::domain::entities::HandlerRegistry;
use goxxx::domain::traits::{Connection, ConnectionEvent};
use goxxx::infrastructure::adapters::{ConsoleConnection, IrcConnection};
use goxxx::infrastructure::config::Config;
use goxxx::infrastructure::database::Database;
use goxxx::infrastructure::http::{HttpClient, DEFAULT_TIMEOUT};
use goxxx::modules::{self, ModuleContext};

#[derive(Parser)]
#[command(name = "goxxx")]
#[command(about = "A single-channel IRC bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and serve the channel
    Run(RunArgs),
    /// Show version
    Version,
    /// Print a default config
    InitConfig,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Channel to join, including the leading '#'
    #[arg(long)]
    channel: Option<String>,

    /// Channel key
    #[arg(long)]
    key: Option<String>,

    #[arg(long)]
    nick: Option<String>,

    /// Server as host[:port]
    #[arg(long)]
    server: Option<String>,

    /// Comma separated module list
    #[arg(long, value_delimiter = ',')]
    modules: Option<Vec<String>>,

    /// Debug logging with source locations
    #[arg(long)]
    debug: bool,

    /// Talk on stdin/stdout instead of IRC
    #[arg(long)]
    console: bool,
}

impl RunArgs {
    fn apply(self, config: &mut Config) {
        if let Some(channel) = self.channel {
            config.irc.channel = channel;
        }
        if self.key.is_some() {
            config.irc.key = self.key;
        }
        if let Some(nick) = self.nick {
            config.irc.nick = nick;
        }
        if let Some(server) = self.server {
            config.irc.server = server;
        }
        if let Some(modules) = self.modules {
            config.modules.enabled = modules;
        }
        config.logging.debug |= self.debug;
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(cli.config, args),
        Commands::Version => {
            println!("goxxx v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
    }
}

fn run(config_path: PathBuf, args: RunArgs) -> ExitCode {
    let console = args.console;
    let config = match Config::load_or_default(&config_path).and_then(|mut config| {
        args.apply(&mut config);
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration ({}): {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start the runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config, console)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Bot stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the subscriber. The returned guard flushes the log file on drop.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>, std::io::Error> {
    let default_level = if config.logging.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let debug = config.logging.debug;

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_file(debug)
        .with_line_number(debug);

    match &config.logging.file {
        Some(path) => {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;
            let file_name = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("goxxx_logs.txt"));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            builder.with_ansi(false).with_writer(writer).init();
            Ok(Some(guard))
        }
        None => {
            builder.init();
            Ok(None)
        }
    }
}

async fn serve(config: Config, console: bool) -> Result<(), BotError> {
    tracing::info!("Starting goxxx v{} for {}", env!("CARGO_PKG_VERSION"), config.irc.channel);

    let db = Arc::new(Database::open(&config.database.path)?);
    let http = HttpClient::new(DEFAULT_TIMEOUT)?;

    let (connection, events): (Arc<dyn Connection>, tokio::sync::mpsc::Receiver<ConnectionEvent>) = if console {
        let (connection, events) = ConsoleConnection::start(config.irc.nick.as_str(), config.irc.channel.as_str());
        tracing::info!("Console mode, talking as {}", connection.operator());
        (Arc::new(connection), events)
    } else {
        let (connection, events) = IrcConnection::connect(&config.irc).await?;
        (Arc::new(connection), events)
    };

    let throttle = Arc::new(ReplyThrottle::new(
        connection.clone(),
        config.irc.channel.as_str(),
        config.throttle.min_interval(),
    ));
    let membership = Arc::new(MembershipTracker::new(
        connection.clone(),
        config.irc.channel.as_str(),
        config.membership.refresh_timeout(),
    ));

    let ctx = ModuleContext {
        db,
        http,
        membership: membership.clone(),
        throttle,
    };
    let mut registry = HandlerRegistry::new();
    modules::install(&mut registry, &config.enabled_modules(), &ctx);
    tracing::info!("{} commands registered", registry.len());

    let dispatcher = MessageDispatcher::new(Arc::new(registry), membership.clone());
    let service = BotService::new(connection, dispatcher, membership, config.irc.key.clone());

    service.run(events, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_config() -> ExitCode {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render config: {}", e);
            ExitCode::FAILURE
        }
    }
}
