use clap::Parser;
use item_distributor_core::config::Config;
use item_distributor_core::error::ConfigError;
use item_distributor_tokio_socket::broker::Broker;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(author, version, about = "Work-item distribution broker")]
struct Cli {
    /// Optional JSON config file; flags below override its fields.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    producer_address: Option<String>,

    #[arg(long)]
    worker_address: Option<String>,

    #[arg(long)]
    heartbeat_interval_ms: Option<u64>,

    #[arg(long)]
    heartbeat_tick_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(address) = self.producer_address {
            config.producer_address = address;
        }
        if let Some(address) = self.worker_address {
            config.worker_address = address;
        }
        if let Some(interval) = self.heartbeat_interval_ms {
            config.heartbeat_interval_ms = interval;
        }
        if let Some(tick) = self.heartbeat_tick_ms {
            config.heartbeat_tick_ms = tick;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Cli::parse()
        .into_config()
        .expect("failed to load configuration");
    let broker = Broker::bind(config).await.expect("failed to bind broker sockets");
    tracing::info!(
        "broker listening: producer {} worker {}",
        broker.producer_addr().expect("producer address"),
        broker.worker_addr().expect("worker address"),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("ctrl-c received, shutting down");
                shutdown.cancel();
            }
        }
    });

    broker.run(shutdown).await;
}
