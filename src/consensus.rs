use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::catalog::ResolverSet;
use crate::dispatch::{dispatch, DnsQuerier};
use crate::error::ConsensusError;
use crate::transport::{ConsensusAnswer, ConsensusOptions, QueryResult};

/// Outcome of counting the successful answers of one fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
	pub majority_address: IpAddr,
	pub agreement_count: usize,
	pub total_responses: usize,
}

/// Count the addresses returned by successful queries.
///
/// The majority is the address with the highest count. Among equally
/// frequent addresses, the one seen first in `results` wins. Returns `None`
/// when no query succeeded.
pub fn tally(results: &[QueryResult]) -> Option<Tally> {
	let mut counts: Vec<(IpAddr, usize)> = Vec::new();
	let mut index: HashMap<IpAddr, usize> = HashMap::new();
	for address in results.iter().filter_map(|r| r.address()) {
		match index.get(&address) {
			Some(&i) => counts[i].1 += 1,
			None => {
				index.insert(address, counts.len());
				counts.push((address, 1));
			}
		}
	}

	let total_responses: usize = counts.iter().map(|(_, n)| n).sum();
	let mut best: Option<(IpAddr, usize)> = None;
	for &(address, count) in &counts {
		// Strictly greater keeps the earliest address on ties
		if best.map_or(true, |(_, top)| count > top) {
			best = Some((address, count));
		}
	}

	best.map(|(majority_address, agreement_count)| Tally {
		majority_address,
		agreement_count,
		total_responses,
	})
}

/// Resolve `domain` through every resolver in the set and take a majority vote.
///
/// When no resolver answers, the whole fan-out is repeated against the same
/// set for as long as `options.retry` allows. Only the answers of the final,
/// successful fan-out are counted.
pub async fn consensus<Q: DnsQuerier>(
	querier: &Arc<Q>,
	domain: &str,
	resolvers: &ResolverSet,
	options: &ConsensusOptions,
) -> Result<ConsensusAnswer, ConsensusError> {
	if resolvers.is_empty() {
		return Err(ConsensusError::EmptyResolverSet(domain.to_string()));
	}

	let start = Instant::now();
	let mut attempts: u32 = 0;
	loop {
		attempts += 1;
		let results = dispatch(querier, domain, resolvers, &options.dispatch).await;

		if let Some(tally) = tally(&results) {
			let elapsed = start.elapsed();
			debug!(
				"{}: {} ({}/{} agree, {} resolvers, attempt {}, {:?})",
				domain, tally.majority_address, tally.agreement_count,
				tally.total_responses, resolvers.len(), attempts, elapsed,
			);
			return Ok(ConsensusAnswer {
				domain: domain.to_string(),
				majority_address: tally.majority_address,
				agreement_count: tally.agreement_count,
				total_responses: tally.total_responses,
				elapsed,
				attempts,
			});
		}

		let elapsed = start.elapsed();
		if !options.retry.allows_retry(attempts, elapsed) {
			return Err(ConsensusError::AllResolversFailed {
				domain: domain.to_string(),
				attempts,
				elapsed,
			});
		}
		warn!(
			"{}: none of {} resolvers answered (attempt {}), retrying",
			domain, resolvers.len(), attempts,
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatch::tests::{MockQuerier, Scripted};
	use crate::transport::{Answer, DispatchOptions, QueryError, RetryPolicy};
	use std::time::Duration;

	fn ok(resolver: &str, address: &str) -> QueryResult {
		QueryResult {
			resolver: resolver.parse().unwrap(),
			domain: "example.com".to_string(),
			outcome: Ok(Answer {
				address: address.parse().unwrap(),
				latency: Duration::from_millis(10),
			}),
		}
	}

	fn failed(resolver: &str) -> QueryResult {
		QueryResult {
			resolver: resolver.parse().unwrap(),
			domain: "example.com".to_string(),
			outcome: Err(QueryError::Timeout),
		}
	}

	fn options(retry: RetryPolicy) -> ConsensusOptions {
		ConsensusOptions {
			dispatch: DispatchOptions {
				timeout: Duration::from_millis(200),
				max_inflight: None,
			},
			retry,
		}
	}

	const FIVE: [&str; 5] = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"];

	#[test]
	fn test_tally_majority() {
		let results = vec![
			ok("10.0.0.1", "5.6.7.8"),
			ok("10.0.0.2", "1.2.3.4"),
			failed("10.0.0.3"),
			ok("10.0.0.4", "1.2.3.4"),
			ok("10.0.0.5", "1.2.3.4"),
			ok("10.0.0.6", "5.6.7.8"),
		];
		let t = tally(&results).unwrap();
		assert_eq!(t.majority_address, "1.2.3.4".parse::<IpAddr>().unwrap());
		assert_eq!(t.agreement_count, 3);
		assert_eq!(t.total_responses, 5);
	}

	#[test]
	fn test_tally_tie_goes_to_first_seen() {
		let results = vec![
			failed("10.0.0.1"),
			ok("10.0.0.2", "9.9.9.9"),
			ok("10.0.0.3", "8.8.8.8"),
			ok("10.0.0.4", "8.8.8.8"),
			ok("10.0.0.5", "9.9.9.9"),
		];
		let t = tally(&results).unwrap();
		assert_eq!(t.majority_address, "9.9.9.9".parse::<IpAddr>().unwrap());
		assert_eq!(t.agreement_count, 2);
		assert_eq!(t.total_responses, 4);
	}

	#[test]
	fn test_tally_agreement_is_max_count() {
		let results = vec![
			ok("10.0.0.1", "1.1.1.1"),
			ok("10.0.0.2", "2.2.2.2"),
			ok("10.0.0.3", "3.3.3.3"),
			ok("10.0.0.4", "3.3.3.3"),
			ok("10.0.0.5", "2.2.2.2"),
			ok("10.0.0.6", "3.3.3.3"),
		];
		let t = tally(&results).unwrap();
		assert_eq!(t.agreement_count, 3);
		assert_eq!(t.majority_address, "3.3.3.3".parse::<IpAddr>().unwrap());
		assert!(t.agreement_count <= t.total_responses);
	}

	#[test]
	fn test_tally_all_failed() {
		assert_eq!(tally(&[failed("10.0.0.1"), failed("10.0.0.2")]), None);
		assert_eq!(tally(&[]), None);
	}

	#[test]
	fn test_tally_single_success() {
		let t = tally(&[failed("10.0.0.1"), ok("10.0.0.2", "7.7.7.7"), failed("10.0.0.3")]).unwrap();
		assert_eq!(t.agreement_count, 1);
		assert_eq!(t.total_responses, 1);
	}

	fn three_two_split() -> MockQuerier {
		MockQuerier::new()
			.script(FIVE[0], vec![Scripted::Answer("1.2.3.4")])
			.script(FIVE[1], vec![Scripted::Answer("5.6.7.8")])
			.script(FIVE[2], vec![Scripted::Answer("1.2.3.4")])
			.script(FIVE[3], vec![Scripted::Answer("5.6.7.8")])
			.script(FIVE[4], vec![Scripted::Answer("1.2.3.4")])
	}

	#[tokio::test]
	async fn test_consensus_three_of_five() {
		let querier = Arc::new(three_two_split());
		let set = ResolverSet::from_ips(&FIVE);

		let answer = consensus(&querier, "example.com", &set, &options(RetryPolicy::attempts(1)))
			.await.unwrap();

		assert_eq!(answer.domain, "example.com");
		assert_eq!(answer.majority_address, "1.2.3.4".parse::<IpAddr>().unwrap());
		assert_eq!(answer.agreement_count, 3);
		assert_eq!(answer.total_responses, 5);
		assert_eq!(answer.attempts, 1);
	}

	#[tokio::test]
	async fn test_consensus_is_repeatable() {
		let querier = Arc::new(three_two_split());
		let set = ResolverSet::from_ips(&FIVE);
		let opts = options(RetryPolicy::attempts(1));

		let first = consensus(&querier, "example.com", &set, &opts).await.unwrap();
		for _ in 0..5 {
			let again = consensus(&querier, "example.com", &set, &opts).await.unwrap();
			assert_eq!(again.majority_address, first.majority_address);
			assert_eq!(again.agreement_count, first.agreement_count);
			assert_eq!(again.total_responses, first.total_responses);
			assert_eq!(again.attempts, first.attempts);
		}
	}

	#[tokio::test]
	async fn test_consensus_single_responder() {
		let querier = Arc::new(MockQuerier::new()
			.script(FIVE[0], vec![Scripted::Fail(QueryError::Timeout)])
			.script(FIVE[1], vec![Scripted::Answer("7.7.7.7")])
			.script(FIVE[2], vec![Scripted::Fail(QueryError::NoNameservers("down".to_string()))]));
		let set = ResolverSet::from_ips(&FIVE[..3]);

		let answer = consensus(&querier, "example.com", &set, &options(RetryPolicy::attempts(1)))
			.await.unwrap();

		assert_eq!(answer.agreement_count, 1);
		assert_eq!(answer.total_responses, 1);
	}

	#[tokio::test]
	async fn test_consensus_uses_only_the_retry_answers() {
		// Everyone times out on the first fan-out; on the retry only two
		// resolvers answer. The stale first-round answers never exist, so a
		// mixture would show up as extra responses.
		let timeout = Scripted::Fail(QueryError::Timeout);
		let querier = Arc::new(MockQuerier::new()
			.script(FIVE[0], vec![timeout.clone(), Scripted::Answer("5.6.7.8")])
			.script(FIVE[1], vec![timeout.clone(), timeout.clone()])
			.script(FIVE[2], vec![timeout.clone(), Scripted::Answer("1.2.3.4")])
			.script(FIVE[3], vec![timeout.clone(), timeout.clone()])
			.script(FIVE[4], vec![timeout.clone(), timeout.clone()]));
		let set = ResolverSet::from_ips(&FIVE);

		let answer = consensus(&querier, "example.com", &set, &options(RetryPolicy::attempts(3)))
			.await.unwrap();

		assert_eq!(answer.attempts, 2);
		assert_eq!(answer.total_responses, 2);
		assert_eq!(answer.agreement_count, 1);
		// Tie between the two retry answers: first in resolver order wins
		assert_eq!(answer.majority_address, "5.6.7.8".parse::<IpAddr>().unwrap());
	}

	#[tokio::test]
	async fn test_bounded_retry_gives_up() {
		let querier = Arc::new(MockQuerier::new()
			.script(FIVE[0], vec![Scripted::Fail(QueryError::Timeout)])
			.script(FIVE[1], vec![Scripted::Fail(QueryError::Timeout)]));
		let set = ResolverSet::from_ips(&FIVE[..2]);

		let err = consensus(&querier, "example.com", &set, &options(RetryPolicy::attempts(3)))
			.await.unwrap_err();

		match err {
			ConsensusError::AllResolversFailed { domain, attempts, .. } => {
				assert_eq!(domain, "example.com");
				assert_eq!(attempts, 3);
			}
			other => panic!("unexpected error: {}", other),
		}
		assert_eq!(querier.calls.load(std::sync::atomic::Ordering::SeqCst), 6);
	}

	#[tokio::test]
	async fn test_unbounded_retry_keeps_going_until_an_answer() {
		let mut steps = vec![Scripted::Fail(QueryError::Timeout); 25];
		steps.push(Scripted::Answer("2.2.2.2"));
		let querier = Arc::new(MockQuerier::new().script(FIVE[0], steps));
		let set = ResolverSet::from_ips(&FIVE[..1]);

		let answer = consensus(&querier, "example.com", &set, &options(RetryPolicy::unbounded()))
			.await.unwrap();

		assert_eq!(answer.attempts, 26);
		assert_eq!(answer.majority_address, "2.2.2.2".parse::<IpAddr>().unwrap());
	}

	#[tokio::test]
	async fn test_deadline_bounds_retry() {
		let querier = Arc::new(MockQuerier::with_delay(Duration::from_millis(30))
			.script(FIVE[0], vec![Scripted::Fail(QueryError::Timeout)]));
		let set = ResolverSet::from_ips(&FIVE[..1]);
		let retry = RetryPolicy {
			max_attempts: None,
			deadline: Some(Duration::from_millis(100)),
		};

		let err = consensus(&querier, "example.com", &set, &options(retry)).await.unwrap_err();
		match err {
			ConsensusError::AllResolversFailed { attempts, elapsed, .. } => {
				assert!(attempts >= 2);
				assert!(elapsed >= Duration::from_millis(100));
			}
			other => panic!("unexpected error: {}", other),
		}
	}

	#[tokio::test]
	async fn test_empty_set_is_rejected() {
		let querier = Arc::new(MockQuerier::new());
		let err = consensus(&querier, "example.com", &ResolverSet::default(), &options(RetryPolicy::unbounded()))
			.await.unwrap_err();
		assert_eq!(err, ConsensusError::EmptyResolverSet("example.com".to_string()));
	}
}
