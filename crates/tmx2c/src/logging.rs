use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize logging to stderr
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init(verbose: u8) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
