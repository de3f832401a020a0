use anyhow::Result;
use broom_server::{init_tracing, run_broom_server, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_broom_server(cli.into_server_config()).await
}
