use anyhow::Result;
use disaster_etl::config::{PipelineConfig, USAGE};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) arguments: messages, categories, database ────────────────
    let Some(cfg) = PipelineConfig::from_args(std::env::args().skip(1)) else {
        println!("{}", USAGE);
        return Ok(());
    };
    info!(?cfg, "startup");

    // ─── 3) load → clean → save ──────────────────────────────────────
    disaster_etl::run(&cfg)?;
    Ok(())
}
