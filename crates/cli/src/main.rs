mod api_commands;
mod config_commands;
mod serve_command;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    wxmp_config::WxmpConfig,
};

#[derive(Parser)]
#[command(name = "wxmp", about = "wxmp: WeChat Official Account client", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (defaults to ./wxmp.toml, then ~/.config/wxmp/).
    #[arg(long, short, global = true, env = "WXMP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook listener.
    Serve {
        /// Address to bind to (overrides config value).
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config value).
        #[arg(long)]
        port: Option<u16>,
        /// Callback path (overrides config value).
        #[arg(long)]
        path: Option<String>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    #[command(flatten)]
    Api(api_commands::ApiCommand),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit or discovered config, then apply `WXMP_*` overrides.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WxmpConfig> {
    let mut config = match path {
        Some(path) => wxmp_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => wxmp_config::discover_and_load(),
    };
    wxmp_config::apply_env_overrides(&mut config);
    debug!(config = ?config, "configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "wxmp starting");

    match cli.command {
        Commands::Config { action } => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Commands::Serve { bind, port, path } => {
            let mut config = load_config(cli.config.as_ref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(path) = path {
                config.server.path = path;
            }
            serve_command::serve(config).await
        },
        Commands::Api(command) => {
            let config = load_config(cli.config.as_ref())?;
            api_commands::handle_api(command, config).await
        },
    }
}
