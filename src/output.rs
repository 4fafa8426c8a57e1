use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::bench::{BenchmarkReport, BenchmarkRound, LastMileComparison};
use crate::stats::{mean, summarize};
use crate::transport::{BenchmarkConfig, SweepPlan};

/// Print a summary of the benchmark configuration before running.
pub fn print_config_summary(
	dataset_path: &str,
	dataset_len: usize,
	plan: &SweepPlan,
	config: &BenchmarkConfig,
) {
	let sampling = &config.sampling;
	let counts: Vec<String> = plan.resolver_counts.iter().map(|c| c.to_string()).collect();
	println!("Consensus DNS Benchmark Configuration");
	println!("=====================================");
	println!("Dataset:         {} ({} resolvers)", dataset_path, dataset_len);
	println!("Resolver counts: {}", counts.join(", "));
	println!("Repetitions:     {}", plan.repetitions);
	println!("Domains:         {}", plan.domains.len());
	println!("Min reliability: {}", sampling.min_reliability);
	if let Some(country) = &sampling.same_country {
		println!("Country:         {}", country);
	}
	let dnssec_label = if sampling.require_dnssec { "yes" } else { "no" };
	println!("DNSSEC only:     {}", dnssec_label);
	println!("Timeout:         {} ms", config.consensus.dispatch.timeout.as_millis());
	match config.consensus.dispatch.max_inflight {
		Some(n) => println!("Concurrency:     {}", n),
		None => println!("Concurrency:     full fan-out"),
	}
	match config.consensus.retry.max_attempts {
		Some(n) => println!("Max attempts:    {}", n),
		None => println!("Max attempts:    unbounded"),
	}
	if let Some(seed) = config.seed {
		println!("Seed:            {}", seed);
	}
	println!();
}

fn secs(value: Option<f64>) -> String {
	value.map_or("-".to_string(), |v| format!("{:.3} s", v))
}

fn millis(value: Option<Duration>) -> String {
	value.map_or("-".to_string(), |d| format!("{:.1} ms", d.as_secs_f64() * 1000.0))
}

fn new_table() -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table
}

/// Print per-size mean times for both arms.
pub fn print_sweep_table(report: &BenchmarkReport) {
	let mut table = new_table();
	table.set_header(vec![
		"Resolvers", "Rounds",
		"Consensus mean", "Consensus p50",
		"Default mean", "Default p50",
	]);

	for point in &report.sweep {
		let rounds: Vec<&BenchmarkRound> = report.rounds.iter()
			.filter(|r| r.resolver_count == point.resolver_count)
			.collect();
		let consensus_all: Vec<f64> = rounds.iter()
			.flat_map(|r| r.consensus_times.iter().copied())
			.collect();
		let baseline_all: Vec<f64> = rounds.iter()
			.flat_map(|r| r.baseline_times.iter().copied())
			.collect();
		let consensus_p50 = (!consensus_all.is_empty()).then(|| summarize(&consensus_all).p50);
		let baseline_p50 = (!baseline_all.is_empty()).then(|| summarize(&baseline_all).p50);

		table.add_row(vec![
			point.resolver_count.to_string(),
			point.rounds.to_string(),
			secs(point.mean_consensus_secs),
			secs(consensus_p50),
			secs(point.mean_baseline_secs),
			secs(baseline_p50),
		]);
	}

	println!("\nConsensus vs Default Resolver");
	println!("=============================\n");
	println!("{table}");
	if !report.skipped_counts.is_empty() {
		let skipped: Vec<String> = report.skipped_counts.iter().map(|c| c.to_string()).collect();
		println!("Skipped (not enough distinct ASNs): {}", skipped.join(", "));
	}
}

/// Print the answers of the final round, one row per domain.
pub fn print_last_round_table(report: &BenchmarkReport) {
	let mut table = new_table();
	table.set_header(vec![
		"Domain", "Majority address", "Agreement", "Attempts",
		"Consensus time", "Default address", "Default time", "Same",
	]);

	for baseline in &report.last_baseline {
		let consensus = report.last_consensus.iter().find(|a| a.domain == baseline.domain);
		let same = match (consensus, baseline.address) {
			(Some(c), Some(addr)) => if c.majority_address == addr { "yes" } else { "no" },
			_ => "-",
		};
		table.add_row(vec![
			baseline.domain.clone(),
			consensus.map_or("-".to_string(), |c| c.majority_address.to_string()),
			consensus.map_or("-".to_string(), |c| format!("{}/{}", c.agreement_count, c.total_responses)),
			consensus.map_or("-".to_string(), |c| c.attempts.to_string()),
			millis(consensus.map(|c| c.elapsed)),
			match (&baseline.address, &baseline.failure) {
				(Some(addr), _) => addr.to_string(),
				(None, Some(e)) => format!("unavailable ({})", e),
				(None, None) => "unavailable".to_string(),
			},
			millis(Some(baseline.elapsed)),
			same.to_string(),
		]);
	}

	let agreement: Vec<f64> = report.last_consensus.iter()
		.map(|a| a.agreement_count as f64)
		.collect();
	println!("\nLast Round Answers");
	println!("==================\n");
	println!("{table}");
	if let Some(avg) = mean(&agreement) {
		println!("Mean majority size: {:.1}", avg);
	}
}

/// Print last-mile latency to the majority and default addresses.
pub fn print_last_mile_table(comparison: &LastMileComparison) {
	let mut table = new_table();
	table.set_header(vec!["Domain", "Majority address", "Majority RTT", "Default address", "Default RTT"]);
	for entry in &comparison.entries {
		table.add_row(vec![
			entry.domain.clone(),
			entry.majority_address.map_or("-".to_string(), |a| a.to_string()),
			millis(entry.majority_rtt),
			entry.default_address.map_or("-".to_string(), |a| a.to_string()),
			millis(entry.default_rtt),
		]);
	}

	println!("\nLast-Mile Latency");
	println!("=================\n");
	println!("{table}");
	let fmt = |v: Option<f64>| v.map_or("-".to_string(), |ms| format!("{:.1} ms", ms));
	println!(
		"Mean RTT: majority {}, default {}",
		fmt(comparison.majority_mean_ms),
		fmt(comparison.default_mean_ms),
	);
}

#[derive(Debug, Serialize)]
struct RoundRow<'a> {
	resolver_count: usize,
	repetition: u32,
	arm: &'a str,
	domains: usize,
	mean_secs: Option<f64>,
	p50_secs: Option<f64>,
	stddev_secs: Option<f64>,
}

fn round_rows(rounds: &[BenchmarkRound]) -> Vec<RoundRow<'static>> {
	let mut rows = Vec::with_capacity(rounds.len() * 2);
	for round in rounds {
		for (arm, times) in [("consensus", &round.consensus_times), ("default", &round.baseline_times)] {
			let stats = (!times.is_empty()).then(|| summarize(times));
			rows.push(RoundRow {
				resolver_count: round.resolver_count,
				repetition: round.repetition,
				arm,
				domains: times.len(),
				mean_secs: stats.map(|s| s.mean),
				p50_secs: stats.map(|s| s.p50),
				stddev_secs: stats.map(|s| s.stddev),
			});
		}
	}
	rows
}

/// Write one row per round and arm as CSV.
pub fn write_rounds<W: Write>(writer: W, rounds: &[BenchmarkRound]) -> Result<()> {
	let mut writer = csv::Writer::from_writer(writer);
	for row in round_rows(rounds) {
		writer.serialize(row)?;
	}
	writer.flush()?;
	Ok(())
}

/// Write per-round timings to a CSV file.
pub fn write_csv(path: &str, rounds: &[BenchmarkRound]) -> Result<()> {
	let file = std::fs::File::create(path)?;
	write_rounds(file, rounds)?;
	println!("\nResults written to: {}", path);
	Ok(())
}
