use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rand::Rng;

use crate::baseline::{baseline, BaselineLookup};
use crate::catalog::{sample, ResolverRecord};
use crate::consensus::consensus;
use crate::dispatch::DnsQuerier;
use crate::error::CatalogError;
use crate::probe::RttProbe;
use crate::stats::mean;
use crate::transport::{BaselineAnswer, BenchmarkConfig, ConsensusAnswer, SamplingOptions, SweepPlan};

/// Timings of one repetition at one resolver-set size, in seconds per domain
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRound {
	pub resolver_count: usize,
	pub repetition: u32,
	pub consensus_times: Vec<f64>,
	pub baseline_times: Vec<f64>,
}

/// Per-size means across repetitions
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
	pub resolver_count: usize,
	pub rounds: usize,
	pub mean_consensus_secs: Option<f64>,
	pub mean_baseline_secs: Option<f64>,
}

/// Everything a sweep produced
#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
	pub rounds: Vec<BenchmarkRound>,
	pub sweep: Vec<SweepPoint>,
	/// Answers of the most recent round, in domain order
	pub last_consensus: Vec<ConsensusAnswer>,
	pub last_baseline: Vec<BaselineAnswer>,
	/// Sizes that could not be sampled from the dataset
	pub skipped_counts: Vec<usize>,
}

/// Run the resolver-count sweep.
///
/// For every size and repetition a fresh resolver set is sampled, then each
/// domain is resolved by consensus and by the default resolver. A size the
/// dataset cannot satisfy is skipped; a domain on which every resolver keeps
/// failing is left out of that round's consensus series.
pub async fn run_benchmark<Q, B, R>(
	querier: &Arc<Q>,
	lookup: &B,
	dataset: &[ResolverRecord],
	plan: &SweepPlan,
	config: &BenchmarkConfig,
	rng: &mut R,
) -> BenchmarkReport
where
	Q: DnsQuerier,
	B: BaselineLookup,
	R: Rng + ?Sized,
{
	let mut report = BenchmarkReport::default();

	for &count in &plan.resolver_counts {
		println!("Comparing {} resolvers against the default resolver", count);
		let sampling = SamplingOptions {
			sample_size: count,
			..config.sampling.clone()
		};
		let mut count_rounds: Vec<BenchmarkRound> = Vec::new();

		for repetition in 0..plan.repetitions {
			let resolvers = match sample(dataset, &sampling, rng) {
				Ok(set) => set,
				Err(CatalogError::InsufficientResolvers { requested, available }) => {
					warn!(
						"skipping {} resolvers: only {} distinct qualifying ASNs (need {})",
						count, available, requested,
					);
					report.skipped_counts.push(count);
					break;
				}
				Err(e) => {
					warn!("skipping {} resolvers: {}", count, e);
					report.skipped_counts.push(count);
					break;
				}
			};

			let mut round = BenchmarkRound {
				resolver_count: count,
				repetition,
				consensus_times: Vec::with_capacity(plan.domains.len()),
				baseline_times: Vec::with_capacity(plan.domains.len()),
			};
			let mut round_consensus = Vec::with_capacity(plan.domains.len());
			let mut round_baseline = Vec::with_capacity(plan.domains.len());

			for domain in &plan.domains {
				match consensus(querier, domain, &resolvers, &config.consensus).await {
					Ok(answer) => {
						round.consensus_times.push(answer.elapsed.as_secs_f64());
						round_consensus.push(answer);
					}
					Err(e) => warn!("{}", e),
				}

				let answer = baseline(
					lookup, domain, config.baseline_timeout, config.baseline_fallback,
				).await;
				round.baseline_times.push(answer.elapsed.as_secs_f64());
				round_baseline.push(answer);
			}

			let agreement = mean(&round_consensus.iter()
				.map(|a| a.agreement_count as f64)
				.collect::<Vec<_>>());
			println!(
				"  Round {}/{}: consensus {} s, default {} s, mean agreement {}",
				repetition + 1, plan.repetitions,
				format_secs(mean(&round.consensus_times)),
				format_secs(mean(&round.baseline_times)),
				agreement.map_or("-".to_string(), |a| format!("{:.1}", a)),
			);

			report.last_consensus = round_consensus;
			report.last_baseline = round_baseline;
			count_rounds.push(round);
		}

		if !count_rounds.is_empty() {
			report.sweep.push(sweep_point(count, &count_rounds));
			report.rounds.extend(count_rounds);
		}
	}

	info!(
		"sweep finished: {} rounds over {} sizes ({} skipped)",
		report.rounds.len(), report.sweep.len(), report.skipped_counts.len(),
	);
	report
}

/// Mean of the per-round means, so every repetition weighs the same.
fn sweep_point(resolver_count: usize, rounds: &[BenchmarkRound]) -> SweepPoint {
	let consensus_means: Vec<f64> = rounds.iter()
		.filter_map(|r| mean(&r.consensus_times))
		.collect();
	let baseline_means: Vec<f64> = rounds.iter()
		.filter_map(|r| mean(&r.baseline_times))
		.collect();
	SweepPoint {
		resolver_count,
		rounds: rounds.len(),
		mean_consensus_secs: mean(&consensus_means),
		mean_baseline_secs: mean(&baseline_means),
	}
}

fn format_secs(value: Option<f64>) -> String {
	value.map_or("-".to_string(), |v| format!("{:.3}", v))
}

/// Last-mile latency for one domain's two answers
#[derive(Debug, Clone, PartialEq)]
pub struct LastMileEntry {
	pub domain: String,
	pub majority_address: Option<IpAddr>,
	pub majority_rtt: Option<Duration>,
	pub default_address: Option<IpAddr>,
	pub default_rtt: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastMileComparison {
	pub entries: Vec<LastMileEntry>,
	/// Mean RTT in milliseconds over the probes that succeeded
	pub majority_mean_ms: Option<f64>,
	pub default_mean_ms: Option<f64>,
}

/// Probe the most recent majority and default addresses of every domain.
pub async fn compare_last_mile<P: RttProbe>(probe: &P, report: &BenchmarkReport) -> LastMileComparison {
	let mut domains: Vec<&str> = report.last_consensus.iter().map(|a| a.domain.as_str()).collect();
	for answer in &report.last_baseline {
		if !domains.contains(&answer.domain.as_str()) {
			domains.push(answer.domain.as_str());
		}
	}

	let mut entries = Vec::with_capacity(domains.len());
	for domain in domains {
		let majority_address = report.last_consensus.iter()
			.find(|a| a.domain == domain)
			.map(|a| a.majority_address);
		let default_address = report.last_baseline.iter()
			.find(|a| a.domain == domain)
			.and_then(|a| a.address);

		entries.push(LastMileEntry {
			domain: domain.to_string(),
			majority_address,
			majority_rtt: probe_optional(probe, majority_address).await,
			default_address,
			default_rtt: probe_optional(probe, default_address).await,
		});
	}

	let millis = |rtts: Vec<Option<Duration>>| -> Option<f64> {
		let values: Vec<f64> = rtts.into_iter()
			.flatten()
			.map(|d| d.as_secs_f64() * 1000.0)
			.collect();
		mean(&values)
	};
	LastMileComparison {
		majority_mean_ms: millis(entries.iter().map(|e| e.majority_rtt).collect()),
		default_mean_ms: millis(entries.iter().map(|e| e.default_rtt).collect()),
		entries,
	}
}

async fn probe_optional<P: RttProbe>(probe: &P, addr: Option<IpAddr>) -> Option<Duration> {
	let addr = addr?;
	match probe.probe(addr).await {
		Ok(rtt) => Some(rtt),
		Err(e) => {
			warn!("probe to {} failed: {}", addr, e);
			None
		}
	}
}
