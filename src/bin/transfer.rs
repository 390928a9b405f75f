use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use wirehttp::config::ClientConfig;
use wirehttp::transfer::{parse_commands, Transfer};

#[derive(Parser)]
#[command(name = "transfer")]
#[command(about = "Run the GET/POST transfers listed in a command file", long_about = None)]
struct Cli {
    /// Command file: `<client_get|client_post> <path> <host> <port>` records
    commands: PathBuf,

    /// Directory downloads are written to and uploads are read from
    #[arg(short, long, env = "WIREHTTP_ROOT", default_value = ".")]
    root: PathBuf,

    /// Seconds to wait for each response
    #[arg(long, default_value_t = 1000)]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    wirehttp::init_logging();
    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.commands)
        .with_context(|| format!("cannot read {}", cli.commands.display()))?;
    let commands = parse_commands(&text);

    let config = ClientConfig::default().with_receive_timeout(Duration::from_secs(cli.timeout));
    let summary = Transfer::new(cli.root, config).run(&commands);

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "all transfers processed"
    );
    Ok(())
}
