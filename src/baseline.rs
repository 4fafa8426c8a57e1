use std::future::Future;
use std::time::{Duration, Instant};

use hickory_resolver::config::ResolverOpts;
use hickory_resolver::TokioResolver;
use log::warn;

use crate::transport::{Answer, BaselineAnswer, QueryError};

/// The host's default resolution path, whatever it is configured to be.
pub trait BaselineLookup: Send + Sync {
	fn lookup(
		&self,
		domain: &str,
		timeout: Duration,
	) -> impl Future<Output = Result<Answer, QueryError>> + Send;
}

/// Resolver built from the system configuration (`/etc/resolv.conf` on Unix)
pub struct SystemBaseline {
	resolver: Option<TokioResolver>,
}

impl SystemBaseline {
	/// Read the system resolver configuration.
	///
	/// A host without usable configuration still gets a baseline; every
	/// lookup then reports that no nameserver is available.
	pub fn new(timeout: Duration) -> Self {
		let mut opts = ResolverOpts::default();
		// The outer timeout in `lookup` must fire first so that a slow
		// default resolver is reported as a timeout.
		opts.timeout = timeout * 2;
		opts.attempts = 1;
		// Every round must measure a real lookup, not a cache hit
		opts.cache_size = 0;

		let resolver = match TokioResolver::builder_tokio() {
			Ok(builder) => Some(builder.with_options(opts).build()),
			Err(e) => {
				warn!("no usable system resolver configuration: {}", e);
				None
			}
		};
		SystemBaseline { resolver }
	}
}

impl BaselineLookup for SystemBaseline {
	async fn lookup(&self, domain: &str, timeout: Duration) -> Result<Answer, QueryError> {
		let resolver = self.resolver.as_ref()
			.ok_or_else(|| QueryError::NoNameservers("system configuration unavailable".to_string()))?;

		let start = Instant::now();
		let response = tokio::time::timeout(timeout, resolver.lookup_ip(domain)).await
			.map_err(|_| QueryError::Timeout)?
			.map_err(|e| QueryError::Resolution(e.to_string()))?;
		let latency = start.elapsed();

		let address = response.iter().next()
			.ok_or_else(|| QueryError::Resolution("no address in answer".to_string()))?;
		Ok(Answer { address, latency })
	}
}

/// Resolve `domain` once through the default resolver.
///
/// On failure the address is absent and `fallback` stands in for the
/// elapsed time, so the round's timing series stays complete.
pub async fn baseline<B: BaselineLookup>(
	lookup: &B,
	domain: &str,
	timeout: Duration,
	fallback: Duration,
) -> BaselineAnswer {
	match lookup.lookup(domain, timeout).await {
		Ok(answer) => BaselineAnswer {
			domain: domain.to_string(),
			address: Some(answer.address),
			elapsed: answer.latency,
			failure: None,
		},
		Err(e) => {
			warn!("baseline unavailable for {}: {} (using {:?})", domain, e, fallback);
			BaselineAnswer {
				domain: domain.to_string(),
				address: None,
				elapsed: fallback,
				failure: Some(e),
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use std::collections::HashMap;

	/// Default resolver stand-in keyed by domain
	#[derive(Default)]
	pub struct MockBaseline {
		answers: HashMap<String, Result<Answer, QueryError>>,
	}

	impl MockBaseline {
		pub fn answer(mut self, domain: &str, address: &str, latency_ms: u64) -> Self {
			self.answers.insert(domain.to_string(), Ok(Answer {
				address: address.parse().unwrap(),
				latency: Duration::from_millis(latency_ms),
			}));
			self
		}

		pub fn fail(mut self, domain: &str, error: QueryError) -> Self {
			self.answers.insert(domain.to_string(), Err(error));
			self
		}
	}

	impl BaselineLookup for MockBaseline {
		async fn lookup(&self, domain: &str, _timeout: Duration) -> Result<Answer, QueryError> {
			self.answers.get(domain)
				.cloned()
				.unwrap_or(Err(QueryError::Timeout))
		}
	}

	#[tokio::test]
	async fn test_baseline_success_keeps_measured_time() {
		let lookup = MockBaseline::default().answer("example.com", "93.184.216.34", 42);
		let answer = baseline(&lookup, "example.com", Duration::from_secs(1), Duration::from_secs(1)).await;
		assert_eq!(answer.address, Some("93.184.216.34".parse().unwrap()));
		assert_eq!(answer.elapsed, Duration::from_millis(42));
		assert!(answer.failure.is_none());
	}

	#[tokio::test]
	async fn test_baseline_timeout_uses_fallback() {
		let lookup = MockBaseline::default().fail("example.com", QueryError::Timeout);
		let fallback = Duration::from_millis(1500);
		let answer = baseline(&lookup, "example.com", Duration::from_secs(1), fallback).await;
		assert_eq!(answer.address, None);
		assert_eq!(answer.elapsed, fallback);
		assert_eq!(answer.failure, Some(QueryError::Timeout));
	}

	#[tokio::test]
	async fn test_baseline_no_nameservers_uses_fallback() {
		let lookup = MockBaseline::default()
			.fail("example.com", QueryError::NoNameservers("none configured".to_string()));
		let answer = baseline(&lookup, "example.com", Duration::from_secs(1), Duration::from_secs(1)).await;
		assert_eq!(answer.address, None);
		assert_eq!(answer.elapsed, Duration::from_secs(1));
		assert!(matches!(answer.failure, Some(QueryError::NoNameservers(_))));
	}

	#[tokio::test]
	async fn test_unconfigured_system_baseline_reports_no_nameservers() {
		let lookup = SystemBaseline { resolver: None };
		let outcome = lookup.lookup("example.com", Duration::from_millis(100)).await;
		assert!(matches!(outcome, Err(QueryError::NoNameservers(_))));
	}
}
