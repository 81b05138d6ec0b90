use anyhow::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
pub fn init() -> Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    Ok(())
}
