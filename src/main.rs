use clap::Parser;

use migraudit::cli::{run, Cli};

/// Enable logging from both `tracing` and `log` crates.
/// Set RUST_LOG to control the level, e.g. RUST_LOG=debug.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sqlx=warn".parse().unwrap())
                .add_directive("migraudit=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .compact()
        .with_target(false)
        .with_ansi(true)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
