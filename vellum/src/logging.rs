//! Wrapper around `tracing_subscriber` for logging.
//!
//! Configures application-wide logging to go to stderr at the `INFO` level,
//! overridable with `RUST_LOG`. If you prefer to use your own logging subscriber,
//! don't initialize the `Logger`.
//!
//! ### Example
//!
//! ```rust
//! use vellum::prelude::*;
//!
//! Logger::init();
//! ```
use crate::colors::tty;
use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::LevelFilter, fmt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Configure logging application-wide.
    ///
    /// Calling this multiple times is safe. Logger will be initialized only once.
    pub fn init() {
        INITIALIZED.get_or_init(setup_logging);
    }
}

fn setup_logging() {
    // Another subscriber may already be installed, e.g. by the application.
    let _ = fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(tty())
        .with_file(false)
        .with_target(false)
        .finish()
        .try_init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_init_twice() {
        Logger::init();
        Logger::init();
        assert!(INITIALIZED.get().is_some());
    }
}
