use anyhow::Context;
use clap::Parser;
use docqa::client::{ApiClient, Repl};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docqa-client",
    about = "Interactive client for the document Q&A service"
)]
struct Cli {
    /// Base URL of the service.
    #[arg(long, env = "DOCQA_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let mut repl = Repl::new(ApiClient::new(cli.api_url));
    repl.run().context("Terminal input failed")
}
