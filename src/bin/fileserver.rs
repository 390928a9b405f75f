use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use wirehttp::config::{ServerConfig, DEFAULT_BACKLOG, DEFAULT_LISTEN_ADDR};
use wirehttp::files::FileHandler;
use wirehttp::http::{Server, DEFAULT_MAX_MESSAGE_SIZE};

#[derive(Parser)]
#[command(name = "fileserver")]
#[command(about = "Serve GET downloads and POST uploads from a directory", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "WIREHTTP_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    listen: String,

    /// Directory files are served from and uploaded to
    #[arg(short, long, env = "WIREHTTP_ROOT", default_value = ".")]
    root: PathBuf,

    /// Idle timeout in seconds, shared out between live connections
    #[arg(long, env = "WIREHTTP_TIMEOUT_BUDGET", default_value_t = 50)]
    timeout_budget: u64,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: i32,

    /// Largest request accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,
}

fn main() -> anyhow::Result<()> {
    wirehttp::init_logging();
    let cli = Cli::parse();

    let config = ServerConfig::new(cli.listen)
        .with_timeout_budget(Duration::from_secs(cli.timeout_budget))
        .with_backlog(cli.backlog)
        .with_max_message_size(cli.max_message_size);

    tracing::info!(root = %cli.root.display(), "serving files");
    let server = Server::bind(config, FileHandler::new(cli.root))?;
    server.serve()
}
