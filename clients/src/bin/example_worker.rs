use bytes::Bytes;
use clap::Parser;
use item_distributor_clients::worker::WorkerClient;
use item_distributor_core::protocol::{QueuePolicy, WorkerParameters};
use item_distributor_core::types::ItemId;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(author, version, about = "Example work-item worker")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:9556")]
    address: String,

    #[arg(long, default_value_t = 1)]
    stride: u64,

    #[arg(long, default_value_t = 0)]
    offset: u64,

    #[arg(long, default_value = "Async", value_parser = parse_policy)]
    policy: QueuePolicy,

    #[arg(long, default_value = "example_worker")]
    name: String,

    /// Mean of the simulated exponentially distributed work time.
    #[arg(long, default_value_t = 500)]
    average_work_ms: u64,
}

fn parse_policy(token: &str) -> Result<QueuePolicy, String> {
    token.parse().map_err(|error| format!("{error}"))
}

fn exponential_wait(average_ms: f64) -> u64 {
    let uniform: f64 = rand::thread_rng().gen_range(0.0..1.0);
    (-average_ms * (1.0 - uniform).ln()) as u64
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let parameters = WorkerParameters::new(cli.stride, cli.offset, cli.policy, cli.name.clone());
    parameters.validate().expect("invalid subscription");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    let average_work_ms = cli.average_work_ms as f64;
    let mut handler = move |id: ItemId, _payload: Bytes| {
        let wait = exponential_wait(average_work_ms);
        async move {
            tracing::info!("working on item {id} for {wait} ms");
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
    };

    let client = WorkerClient::new(cli.address, parameters);
    client
        .run(&mut handler, &shutdown)
        .await
        .expect("worker failed");
}
