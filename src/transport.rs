use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

/// Default per-query timeout, covering socket setup and the full exchange
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a single resolver failed to produce an address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
	#[error("query timed out")]
	Timeout,
	#[error("no nameserver reachable: {0}")]
	NoNameservers(String),
	#[error("resolution failed: {0}")]
	Resolution(String),
}

/// A successful answer from one resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
	pub address: IpAddr,
	pub latency: Duration,
}

/// Result of a single DNS query against one resolver
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct QueryResult {
	pub resolver: IpAddr,
	pub domain: String,
	pub outcome: Result<Answer, QueryError>,
}

impl QueryResult {
	pub fn address(&self) -> Option<IpAddr> {
		self.outcome.as_ref().ok().map(|a| a.address)
	}
}

/// Majority answer for one domain across a resolver set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusAnswer {
	pub domain: String,
	pub majority_address: IpAddr,
	pub agreement_count: usize,
	pub total_responses: usize,
	/// Wall-clock time from the first fan-out to the final tally
	pub elapsed: Duration,
	pub attempts: u32,
}

/// Answer from the host's default resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineAnswer {
	pub domain: String,
	pub address: Option<IpAddr>,
	/// Measured lookup time, or the fallback value when `failure` is set
	pub elapsed: Duration,
	pub failure: Option<QueryError>,
}

/// Resolver sampling policy
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
	pub min_reliability: f64,
	pub same_country: Option<String>,
	pub require_dnssec: bool,
	pub sample_size: usize,
}

impl Default for SamplingOptions {
	fn default() -> Self {
		SamplingOptions {
			min_reliability: 0.9,
			same_country: None,
			require_dnssec: false,
			sample_size: 10,
		}
	}
}

/// Fan-out configuration for one dispatch call
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
	pub timeout: Duration,
	/// Cap on in-flight queries; `None` means one slot per resolver
	pub max_inflight: Option<usize>,
}

impl Default for DispatchOptions {
	fn default() -> Self {
		DispatchOptions {
			timeout: DEFAULT_QUERY_TIMEOUT,
			max_inflight: None,
		}
	}
}

/// How often the consensus fan-out is repeated when nobody answers.
///
/// Both limits are optional. With neither set the fan-out repeats until at
/// least one resolver answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: Option<u32>,
	pub deadline: Option<Duration>,
}

impl RetryPolicy {
	pub fn unbounded() -> Self {
		RetryPolicy::default()
	}

	pub fn attempts(max_attempts: u32) -> Self {
		RetryPolicy {
			max_attempts: Some(max_attempts),
			deadline: None,
		}
	}

	/// Whether another attempt is allowed after `attempts_made` attempts
	/// spanning `elapsed`.
	pub fn allows_retry(&self, attempts_made: u32, elapsed: Duration) -> bool {
		if let Some(max) = self.max_attempts {
			if attempts_made >= max {
				return false;
			}
		}
		if let Some(deadline) = self.deadline {
			if elapsed >= deadline {
				return false;
			}
		}
		true
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusOptions {
	pub dispatch: DispatchOptions,
	pub retry: RetryPolicy,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
	pub sampling: SamplingOptions,
	pub consensus: ConsensusOptions,
	pub baseline_timeout: Duration,
	pub baseline_fallback: Duration,
	pub seed: Option<u64>,
}

/// Which resolver-set sizes to sweep and over which domains
#[derive(Debug, Clone)]
pub struct SweepPlan {
	pub resolver_counts: Vec<usize>,
	pub repetitions: u32,
	pub domains: Vec<String>,
}

impl SweepPlan {
	/// 10, 20, ... 100
	pub fn default_counts() -> Vec<usize> {
		(1..=10).map(|i| i * 10).collect()
	}
}
