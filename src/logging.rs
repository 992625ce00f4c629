//! Tracing subscriber initialisation.
//!
//! Only the binary calls [`init_logging`]; the library only emits events.
//!
//! | Flag(s)   | Filter level |
//! |-----------|--------------|
//! | (none)    | WARN         |
//! | `-v`      | INFO         |
//! | `-vv`     | DEBUG        |
//! | `-vvv`    | TRACE        |
//! | `--quiet` | ERROR        |
//!
//! `RUST_LOG` overrides all of the above if set.

use std::io::IsTerminal as _;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, writing to stderr.
pub fn init_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
	let level = derive_level(verbose, quiet);

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("sitebake={level}")));

	let fmt_layer = tracing_subscriber::fmt::layer()
		.with_target(false)
		.with_ansi(std::io::stderr().is_terminal())
		.with_writer(std::io::stderr);

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt_layer)
		.try_init()
		.map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))?;

	Ok(())
}

/// Translate the verbosity counter and quiet flag to a level string.
fn derive_level(verbose: u8, quiet: bool) -> &'static str {
	if quiet {
		return "error";
	}
	match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}
