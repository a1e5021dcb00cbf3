#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the mandi sync toolchain.
//!
//! Provides [`init_logger`], which installs a timestamped
//! `pretty_env_logger` wrapped in a [`RedactingLogger`] so that URLs and
//! credential-looking substrings never reach the log stream, whichever
//! crate emitted the line.

pub mod redact;

use log::{Log, Metadata, Record};

/// A [`Log`] wrapper that scrubs every message with [`redact::redact`]
/// before handing it to the inner logger.
pub struct RedactingLogger<L> {
    inner: L,
}

impl<L: Log> RedactingLogger<L> {
    /// Wraps `inner`.
    #[must_use]
    pub const fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: Log> Log for RedactingLogger<L> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }

        let message = redact::redact(&record.args().to_string());
        self.inner.log(
            &Record::builder()
                .metadata(record.metadata().clone())
                .args(format_args!("{message}"))
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build(),
        );
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initializes the global logger.
///
/// Level defaults to `info` and can be overridden with `RUST_LOG`. Calling
/// this more than once (e.g. from tests) leaves the first logger in place.
pub fn init_logger() {
    let logger = pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if log::set_boxed_logger(Box::new(RedactingLogger::new(logger))).is_ok() {
        log::set_max_level(level);
    }
}
