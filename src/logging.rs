//! Logging setup.
//!
//! Levels come from `RUST_LOG` (e.g. `RUST_LOG=sweeptrader::domain::sweep=debug`);
//! without it everything at `info` and above is shown. Output goes to stderr so
//! that report lines on stdout stay machine-readable.

use log::LevelFilter;

pub fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false);

    // A second init (e.g. from tests driving the CLI) is harmless.
    let _ = builder.try_init();
}
