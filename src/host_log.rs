// Presence Tag — Host Log Backend
//
// On the board `EspLogger` prints the `log` records.  Host builds (replay
// runs) write them to stderr instead.

use log::{LevelFilter, Log, Metadata, Record};

pub struct HostLogger;

static LOGGER: HostLogger = HostLogger;

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger.  Fails if a logger is already set.
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow::anyhow!("logger already installed: {}", e))?;
    log::set_max_level(level);
    Ok(())
}
