use anyhow::Result;
use clap::Parser;
use ledgerly::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ledgerly::telemetry::init(cli.verbose);
    cli.run().await
}
