use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading or sampling the resolver dataset
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read resolver dataset '{path}': {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("malformed resolver dataset: {0}")]
	Dataset(#[from] csv::Error),

	/// The diversity constraint (one resolver per ASN) cannot be met
	#[error("requested {requested} resolvers but only {available} distinct qualifying ASNs exist")]
	InsufficientResolvers { requested: usize, available: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
	#[error("no resolver answered for '{domain}' after {attempts} attempt(s) in {elapsed:?}")]
	AllResolversFailed {
		domain: String,
		attempts: u32,
		elapsed: Duration,
	},

	#[error("cannot reach consensus for '{0}' with an empty resolver set")]
	EmptyResolverSet(String),
}

/// Errors from a last-mile latency probe
#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("failed to run ping: {0}")]
	Spawn(#[from] std::io::Error),

	#[error("could not find a round-trip time in ping output")]
	Unparsable,

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("unexpected HTTP status {0}")]
	Status(u16),
}
