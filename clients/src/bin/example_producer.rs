use bytes::Bytes;
use clap::Parser;
use item_distributor_clients::producer::ProducerClient;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Example work-item producer")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:9555")]
    address: String,

    /// Number of work items to generate.
    #[arg(long, default_value_t = 5)]
    count: u64,

    #[arg(long, default_value_t = 500)]
    send_interval_ms: u64,
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
    let mut client = ProducerClient::connect(&cli.address)
        .await
        .expect("failed to connect to broker");

    let mut outstanding = BTreeSet::new();
    let mut next_id = 0u64;
    let mut send_timer = tokio::time::interval(Duration::from_millis(cli.send_interval_ms));

    while next_id < cli.count || !outstanding.is_empty() {
        tokio::select! {
            completion = client.receive_completion() => {
                let id = completion.expect("producer channel failed");
                tracing::info!("item {id} released");
                if !outstanding.remove(&id) {
                    tracing::error!("completion for unknown item {id}");
                }
            }
            _ = send_timer.tick(), if next_id < cli.count => {
                tracing::info!("item {next_id} generated");
                outstanding.insert(next_id);
                client
                    .send_work_item(next_id, Bytes::new())
                    .await
                    .expect("failed to send work item");
                next_id += 1;
            }
        }
    }

    tracing::info!("all {} items completed", cli.count);
}
