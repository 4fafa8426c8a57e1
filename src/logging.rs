use std::io::Write;

use log::LevelFilter;

/// Initialize env_logger for diagnostics on stderr.
///
/// `RUST_LOG` is honoured; an explicit `level` overrides it. Benchmark
/// progress and result tables are printed separately on stdout.
pub fn init_logger(level: Option<LevelFilter>) {
	let mut builder = env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or("warn"),
	);
	if let Some(level) = level {
		builder.filter_level(level);
	}
	// hickory logs every malformed or late datagram
	builder.filter_module("hickory_proto", LevelFilter::Error);
	builder.filter_module("hickory_resolver", LevelFilter::Warn);
	builder.format(|buf, record| {
		writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
	});
	// A logger may already be installed (e.g. by a test harness)
	let _ = builder.try_init();
}
