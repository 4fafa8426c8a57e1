use clap::{Parser, ValueEnum};

/// Majority-vote DNS resolution benchmark
#[derive(Parser, Debug)]
#[command(name = "consensus-dns-bench")]
#[command(about = "Compare majority-vote resolution across public resolvers with the default resolver")]
pub struct Cli {
	/// CSV dataset of public resolvers (ip, ASN, country_id, reliability, dnssec)
	#[arg(short = 'd', long = "dataset", default_value = "public_servers.csv")]
	pub dataset: String,

	/// File containing target domains (one per line)
	#[arg(long = "domains")]
	pub domains: Option<String>,

	/// Resolver-set sizes to sweep, comma separated (default 10,20,...,100)
	#[arg(long = "counts", value_delimiter = ',')]
	pub counts: Vec<usize>,

	/// Repetitions per resolver-set size
	#[arg(short = 'n', long = "repetitions", default_value = "4")]
	pub repetitions: u32,

	/// Per-query timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "1000")]
	pub timeout: u64,

	/// Maximum concurrent in-flight queries per fan-out (default: all resolvers)
	#[arg(short = 'c', long = "concurrency")]
	pub concurrency: Option<usize>,

	/// Only sample resolvers with reliability above this value
	#[arg(long = "min-reliability", default_value = "0.9")]
	pub min_reliability: f64,

	/// Only sample resolvers from this country code (e.g. US)
	#[arg(long = "country")]
	pub country: Option<String>,

	/// Only sample resolvers that support DNSSEC
	#[arg(long = "dnssec")]
	pub dnssec: bool,

	/// Fan-out attempts per domain before giving up (0 retries forever)
	#[arg(long = "max-attempts", default_value = "5")]
	pub max_attempts: u32,

	/// Overall retry deadline per domain in milliseconds
	#[arg(long = "retry-deadline-ms")]
	pub retry_deadline_ms: Option<u64>,

	/// Elapsed time recorded when the default resolver fails, in milliseconds
	#[arg(long = "baseline-fallback-ms", default_value = "1000")]
	pub baseline_fallback_ms: u64,

	/// Last-mile latency probe run against the final answers
	#[arg(long = "probe", value_enum, default_value_t = ProbeKind::Ping)]
	pub probe: ProbeKind,

	/// HTTP probe timeout in milliseconds
	#[arg(long = "probe-timeout-ms", default_value = "3000")]
	pub probe_timeout_ms: u64,

	/// Output CSV file path for per-round timings
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Random seed for reproducible resolver sampling
	#[arg(short = 's', long = "seed")]
	pub seed: Option<u64>,

	/// Diagnostic log level (RUST_LOG is used when not given)
	#[arg(long = "log-level", value_enum)]
	pub log_level: Option<LogLevel>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProbeKind {
	/// OS ping utility
	Ping,
	/// Plain HTTP GET to the address
	Http,
	/// Skip the last-mile comparison
	None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl From<LogLevel> for log::LevelFilter {
	fn from(level: LogLevel) -> Self {
		match level {
			LogLevel::Error => log::LevelFilter::Error,
			LogLevel::Warn => log::LevelFilter::Warn,
			LogLevel::Info => log::LevelFilter::Info,
			LogLevel::Debug => log::LevelFilter::Debug,
			LogLevel::Trace => log::LevelFilter::Trace,
		}
	}
}
