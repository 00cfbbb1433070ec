use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bench_cli::{Args, Bench};
use infrastructure::config::BenchConfig;

fn run() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = BenchConfig::load(&args.config_dir)?;
    config.verbose |= args.verbose;
    info!(
        config_dir = %args.config_dir,
        simulate = args.simulate,
        "🔬 Optical bench starting"
    );

    let bench = Bench::from_config(config, args.simulate)?;
    let output = bench.run(&args.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}
