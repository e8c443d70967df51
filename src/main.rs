use std::path::PathBuf;

use clap::Parser;

use fairtick::{Config, DEFAULT_SOCKET};

/// Tick-driven fair-share CPU scheduler. Connects to an event producer over
/// a unix socket and answers every event batch with a scheduling decision.
#[derive(Parser, Debug)]
#[command(name = "fairtick", version, about)]
struct Cli {
    /// Socket path of the event producer.
    #[arg(short, long, env = "FAIRTICK_SOCKET", default_value = DEFAULT_SOCKET)]
    socket: PathBuf,

    /// Number of logical CPUs to schedule (1-128).
    #[arg(short, long, env = "FAIRTICK_CPUS", default_value_t = 4)]
    cpus: usize,

    /// Milliseconds of runtime accounted per tick.
    #[arg(short, long, env = "FAIRTICK_QUANTA", default_value_t = 1)]
    quanta: u64,

    /// Attach scheduling metadata to every decision.
    #[arg(short, long)]
    metadata: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.socket, cli.cpus, cli.quanta, cli.metadata)?;

    fairtick::run(config).await?;
    Ok(())
}
