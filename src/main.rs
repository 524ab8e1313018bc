use clap::Parser;

use brick_enricher::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = brick_enricher::run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
