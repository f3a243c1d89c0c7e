use capturekit_cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = capturekit_cli::run(cli).await;
    std::process::exit(exit_code);
}
