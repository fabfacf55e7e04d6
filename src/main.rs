use clap::Parser;
use vmprune_cli::display::print_error;
use vmprune_cli::{run, Cli};

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_level(cli.verbose)),
    )
    .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
