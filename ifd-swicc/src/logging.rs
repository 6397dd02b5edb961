//! Logger setup
//!
//! The driver logs through the `log` facade. A stderr logger is installed the
//! first time the handler is created, unless pcscd (or a test harness)
//! already installed one.

use log::LevelFilter;
use once_cell::sync::OnceCell;
use simple_logger::SimpleLogger;

static LOGGER: OnceCell<bool> = OnceCell::new();

/// Install the logger at `level`
///
/// Only the first call has any effect. Returns whether this crate's logger
/// ended up installed.
pub fn init(level: LevelFilter) -> bool {
    *LOGGER.get_or_init(|| SimpleLogger::new().with_level(level).init().is_ok())
}
