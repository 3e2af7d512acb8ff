use clap::Parser;
use flowguard::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let _guard = logging::init(&args.command)?;
    cli::run(args).await
}
