use clap::Parser;
use mock_mediator::logging::{init_tracing, LogFormat};
use mock_mediator::transport::stdio::serve_stdio;
use mock_mediator::{metrics, Mediator, MediatorFile};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Resolve intercepted requests read from stdin against declarative mock handlers.
#[derive(Parser, Debug)]
#[command(name = "mock-mediator", author, version, about)]
struct Args {
    /// Handler configuration file (YAML, or JSON with a .json extension)
    #[arg(short, long, env = "MOCK_MEDIATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress the log line for mocked requests
    #[arg(short, long, env = "MOCK_MEDIATOR_QUIET")]
    quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print Prometheus metrics to stderr when the input closes
    #[arg(long)]
    dump_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let file = match &args.config {
        Some(path) => MediatorFile::from_file(path)?,
        None => MediatorFile::default(),
    };

    let mut config = file.mediator_config();
    config.quiet |= args.quiet;

    let handlers = file.build_handlers()?;
    info!(
        "Loaded {} handler(s){}",
        handlers.len(),
        if config.quiet { ", quiet mode" } else { "" }
    );

    let mediator = Arc::new(Mediator::new(handlers, config));
    serve_stdio(mediator).await?;

    if args.dump_metrics {
        eprintln!("{}", metrics::collect_metrics());
    }
    Ok(())
}
