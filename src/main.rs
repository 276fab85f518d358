use clap::Parser;

use depgraph_cli::{exit_code, format_error, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = depgraph_cli::run(cli).await {
        eprintln!("{}", format_error(&format!("{:#}", e)));
        std::process::exit(exit_code(&e));
    }
}
