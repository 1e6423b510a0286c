use crate::environment::Environment;

use once_cell::sync::OnceCell;

pub struct LogGuard;

pub(crate) static LOGGER: OnceCell<LogGuard> = OnceCell::new();

/// Initialize logger with custom format and verbosity.
///
/// The subscriber is installed at most once per process. If another global
/// subscriber was installed first (e.g. by a test harness), that one is kept.
pub fn initialize_logger(environment: &Environment) {
    LOGGER.get_or_init(|| {
        use tracing_subscriber::{fmt::format::Format, FmtSubscriber};

        let verbosity = environment.verbosity();

        let subscriber = FmtSubscriber::builder()
            // All spans/events with a level higher than the configured verbosity
            // will be written to stdout.
            .with_max_level(verbosity)
            .with_target(false)
            .event_format(Format::default())
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("A global tracing subscriber is already set, keeping it");
        }

        LogGuard {}
    });
}
