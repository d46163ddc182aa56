mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(err) = Cli::run_from_args().await {
        eprintln!("fetcher error: {:#}", err);
        std::process::exit(1);
    }
}
