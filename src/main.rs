mod baseline;
mod bench;
mod catalog;
mod cli;
mod consensus;
mod dispatch;
mod dns;
mod domains;
mod error;
mod logging;
mod output;
mod probe;
mod stats;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::baseline::SystemBaseline;
use crate::cli::{Cli, ProbeKind};
use crate::dispatch::UdpQuerier;
use crate::probe::{HttpProbe, PingProbe};
use crate::transport::{
	BenchmarkConfig, ConsensusOptions, DispatchOptions, RetryPolicy, SamplingOptions, SweepPlan,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_logger(cli.log_level.map(Into::into));

	let dataset = catalog::load_dataset(&cli.dataset)?;

	let domains = match &cli.domains {
		Some(path) => domains::read_domain_file(path)?,
		None => domains::default_target_domains(),
	};
	let resolver_counts = if cli.counts.is_empty() {
		SweepPlan::default_counts()
	} else {
		cli.counts.clone()
	};
	let plan = SweepPlan {
		resolver_counts,
		repetitions: cli.repetitions,
		domains,
	};

	// 0 keeps retrying until some resolver answers
	let mut retry = if cli.max_attempts == 0 {
		RetryPolicy::unbounded()
	} else {
		RetryPolicy::attempts(cli.max_attempts)
	};
	retry.deadline = cli.retry_deadline_ms.map(Duration::from_millis);
	let timeout = Duration::from_millis(cli.timeout);
	let config = BenchmarkConfig {
		sampling: SamplingOptions {
			min_reliability: cli.min_reliability,
			same_country: cli.country.clone(),
			require_dnssec: cli.dnssec,
			..SamplingOptions::default()
		},
		consensus: ConsensusOptions {
			dispatch: DispatchOptions {
				timeout,
				max_inflight: cli.concurrency,
			},
			retry,
		},
		baseline_timeout: timeout,
		baseline_fallback: Duration::from_millis(cli.baseline_fallback_ms),
		seed: cli.seed,
	};

	output::print_config_summary(&cli.dataset, dataset.len(), &plan, &config);

	// Seeded RNG makes resolver sampling reproducible
	let mut rng = match config.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_entropy(),
	};
	let querier = Arc::new(UdpQuerier);
	let lookup = SystemBaseline::new(config.baseline_timeout);

	println!("Running benchmark...");
	let report = bench::run_benchmark(
		&querier, &lookup, &dataset, &plan, &config, &mut rng,
	).await;

	if report.rounds.is_empty() {
		anyhow::bail!(
			"no resolver-set size could be sampled from '{}'; lower --counts or relax the filters",
			cli.dataset,
		);
	}

	output::print_sweep_table(&report);
	output::print_last_round_table(&report);

	let comparison = match cli.probe {
		ProbeKind::Ping => Some(bench::compare_last_mile(&PingProbe::default(), &report).await),
		ProbeKind::Http => {
			let probe = HttpProbe::new(Duration::from_millis(cli.probe_timeout_ms))?;
			Some(bench::compare_last_mile(&probe, &report).await)
		}
		ProbeKind::None => None,
	};
	if let Some(comparison) = &comparison {
		output::print_last_mile_table(comparison);
	}

	if let Some(path) = &cli.output {
		output::write_csv(path, &report.rounds)?;
	}

	Ok(())
}
