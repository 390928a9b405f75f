use clap::Parser;
use std::time::{Duration, Instant};
use tracing::{error, info};
use wirehttp::config::ClientConfig;
use wirehttp::http::Client;

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Open many connections, then time one GET on each", long_about = None)]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value = "8080")]
    port: String,

    /// Number of connections held open at the same time
    #[arg(short, long, default_value_t = 15000)]
    connections: usize,

    /// Path requested on every connection
    #[arg(long, default_value = "/text.txt")]
    path: String,

    /// Seconds to wait for each response
    #[arg(long, default_value_t = 1000)]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    wirehttp::init_logging();
    let cli = Cli::parse();
    let config = ClientConfig::default().with_receive_timeout(Duration::from_secs(cli.timeout));

    let mut clients = Vec::with_capacity(cli.connections);
    for _ in 0..cli.connections {
        match Client::connect_with(&cli.host, &cli.port, config.clone()) {
            Ok(client) => clients.push(client),
            Err(err) => error!(error = %err, "connect failed"),
        }
    }
    anyhow::ensure!(!clients.is_empty(), "no connection could be opened");
    info!(open = clients.len(), "connections established");

    let mut total = Duration::ZERO;
    let mut completed = 0u32;
    for client in &mut clients {
        let started = Instant::now();
        match client.get(&cli.path) {
            Ok(_) => {
                total += started.elapsed();
                completed += 1;
            }
            Err(err) => error!(error = %err, "request failed"),
        }
    }
    anyhow::ensure!(completed > 0, "no request completed");

    let average = total.as_secs_f64() * 1000.0 / f64::from(completed);
    println!(
        "Using {} concurrent connections, a single request takes on avg {:.3} ms.",
        clients.len(),
        average
    );
    Ok(())
}
