use anyhow::Context as _;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,serenity=warn";

pub struct Logger {}

impl Logger {
    /// Logs to stdout, filtered by `RUST_LOG` when it is set.
    pub fn initialize() -> anyhow::Result<()> {
        let filter = filter(std::env::var("RUST_LOG").ok().as_deref())?;

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::Layer::new().with_writer(std::io::stdout))
            .try_init()?;

        std::panic::set_hook(Box::new(|panic| match panic.location() {
            Some(location) => error!(
                panic = %panic,
                file = location.file(),
                line = location.line(),
                "panicked"
            ),
            None => error!(panic = %panic, "panicked"),
        }));

        Ok(())
    }
}

fn filter(rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("RUST_LOG is not a valid filter: {:?}", directives)),
        None => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}
