//! Tracing subscriber bootstrap
//!
//! The emulator crates only emit `tracing` events. Installing a subscriber is
//! left to the test binary: [`init_from`] for the `[logging]` config section,
//! or [`init_for_tests`] to route output through libtest capture.

use crate::config::LoggingSettings;
use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where formatted events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Stderr,
    TestCapture,
}

/// Install a global subscriber writing to stderr. `RUST_LOG` overrides `level`.
pub fn init(level: &str, json: bool) -> anyhow::Result<()> {
    install(level, json, Sink::Stderr)
}

/// Install a plain-text subscriber whose output libtest captures per test
pub fn init_for_tests(level: &str) -> anyhow::Result<()> {
    install(level, false, Sink::TestCapture)
}

/// Initialize logging from the `[logging]` section
pub fn init_from(settings: &LoggingSettings) -> anyhow::Result<()> {
    init(&settings.level, settings.format == "json")
}

fn install(level: &str, json: bool, sink: Sink) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match (json, sink) {
        (true, _) => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        (false, Sink::Stderr) => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        (false, Sink::TestCapture) => registry.with(fmt::layer().with_target(true).with_test_writer()).try_init(),
    };
    installed.context("a global tracing subscriber is already installed")
}
