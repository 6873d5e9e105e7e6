//! straybot - Straylight chat bot
//!
//! Loads the configuration, opens the outcome log and the record store,
//! loads the plugins and connects to the selected environment's server.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use straybot::config::{Config, validation};
use straybot::db::Database;
use straybot::kernel::Kernel;
use straybot::logger::Logger;
use straybot::network::{IrcClient, IrcSender};
use straybot::{handlers, http, metrics, telemetry};
use tracing::{error, info};

/// Outgoing lines buffered ahead of the connection writer.
const OUTGOING_QUEUE: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "straybot", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(default_value = "config.toml")]
    config: PathBuf,

    /// Environment to run (a key under [environments])
    #[arg(short, long, default_value = "testing")]
    env: String,

    /// Emit diagnostics as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_tracing("info", args.json_logs);

    let config = Config::load(&args.config).map_err(|e| {
        error!(path = %args.config.display(), error = %e, "Failed to load config");
        e
    })?;
    let env = config.environment(&args.env)?.clone();

    info!(
        env = %args.env,
        server = %env.server,
        nick = %env.nickname,
        "Starting straybot"
    );

    if let Err(errors) = validation::validate(&config, &env) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Refusing to start with {} configuration error(s)",
            errors.len()
        ));
    }

    let logger = Arc::new(Logger::open(
        &config.logging.path,
        config.log_filter(&env)?,
    )?);
    info!(path = %config.logging.path, filter = %logger.filter(), "Outcome log opened");

    let db = Database::new(&config.database.path).await?;
    info!(path = %config.database.path, "Database ready");

    // Convention: metrics port 0 or absent disables the HTTP endpoint.
    match config.metrics.enabled_port() {
        Some(port) => {
            metrics::init();
            tokio::spawn(http::run_http_server(port));
            info!(port, "Prometheus HTTP server started");
        }
        None => info!("Metrics disabled"),
    }

    let catalog = handlers::catalog(&config, &db)?;
    let (sender, outgoing) = IrcSender::channel(OUTGOING_QUEUE);
    let kernel = Arc::new(
        Kernel::builder(Arc::new(sender), logger)
            .prefix(config.bot.prefix.clone())
            .nickname(env.nickname.clone())
            .admins(config.bot.admins.clone())
            .plugins(catalog)
            .build()?,
    );
    kernel.reload()?;

    let client = IrcClient::new(env, Arc::clone(&kernel), outgoing);
    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(())
}
