use std::process::ExitCode;

use anyhow::Result;
use archgen::cli::Cli;
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    archgen::init_tracing(cli.verbose);
    archgen::run(cli).await
}
