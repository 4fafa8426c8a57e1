use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::error::CatalogError;
use crate::transport::SamplingOptions;

/// One candidate public resolver and its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverRecord {
	pub ip: IpAddr,
	pub asn: String,
	pub country_id: String,
	pub reliability: f64,
	pub supports_dnssec: bool,
}

/// A dataset row as found on disk; any cell may be missing.
///
/// Columns not named here (created_at, checked_at, city, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
	ip: Option<String>,
	#[serde(rename = "ASN")]
	asn: Option<String>,
	country_id: Option<String>,
	reliability: Option<String>,
	dnssec: Option<String>,
}

impl RawRecord {
	fn into_record(self) -> Option<ResolverRecord> {
		let ip = self.ip?.trim().parse().ok()?;
		let asn = normalize_asn(&self.asn?)?;
		let country_id = self.country_id?.trim().to_string();
		if country_id.is_empty() {
			return None;
		}
		let reliability: f64 = self.reliability?.trim().parse().ok()?;
		if !reliability.is_finite() {
			return None;
		}
		let supports_dnssec = parse_bool(&self.dnssec?)?;
		Some(ResolverRecord { ip, asn, country_id, reliability, supports_dnssec })
	}
}

/// Accept the spellings produced by common CSV writers.
fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Some(true),
		"false" | "0" | "no" => Some(false),
		_ => None,
	}
}

/// Float-typed tooling writes ASNs as "15169.0"; strip that back to "15169".
fn normalize_asn(value: &str) -> Option<String> {
	let trimmed = value.trim();
	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
		return None;
	}
	let asn = match trimmed.strip_suffix(".0") {
		Some(whole) if !whole.is_empty() && whole.chars().all(|c| c.is_ascii_digit()) => whole,
		_ => trimmed,
	};
	Some(asn.to_string())
}

/// Read a resolver dataset from a CSV file with a header row.
pub fn load_dataset(path: &str) -> Result<Vec<ResolverRecord>, CatalogError> {
	let file = File::open(path).map_err(|source| CatalogError::Io {
		path: path.to_string(),
		source,
	})?;
	read_dataset(file)
}

/// Parse a resolver dataset, dropping rows that lack a required column.
pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<ResolverRecord>, CatalogError> {
	let mut csv_reader = csv::ReaderBuilder::new()
		.flexible(true)
		.trim(csv::Trim::All)
		.from_reader(reader);
	csv_reader.headers()?;

	let mut records = Vec::new();
	let mut dropped = 0usize;
	for (line, row) in csv_reader.deserialize::<RawRecord>().enumerate() {
		let parsed = match row {
			Ok(raw) => raw.into_record(),
			Err(e) => {
				debug!("skipping dataset row {}: {}", line + 1, e);
				None
			}
		};
		match parsed {
			Some(record) => records.push(record),
			None => dropped += 1,
		}
	}

	info!("loaded {} resolvers ({} incomplete rows dropped)", records.len(), dropped);
	Ok(records)
}

/// A sampled set of resolvers, at most one per ASN
#[derive(Debug, Clone, Default)]
pub struct ResolverSet {
	resolvers: Vec<ResolverRecord>,
}

impl ResolverSet {
	pub fn ips(&self) -> impl Iterator<Item = IpAddr> + '_ {
		self.resolvers.iter().map(|r| r.ip)
	}

	pub fn len(&self) -> usize {
		self.resolvers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resolvers.is_empty()
	}

	/// Build a set directly from addresses, each treated as its own ASN.
	#[cfg(test)]
	pub fn from_ips(ips: &[&str]) -> Self {
		let resolvers = ips.iter()
			.map(|ip| ResolverRecord {
				ip: ip.parse().unwrap(),
				asn: ip.to_string(),
				country_id: "US".to_string(),
				reliability: 1.0,
				supports_dnssec: true,
			})
			.collect();
		ResolverSet { resolvers }
	}
}

fn qualifies(record: &ResolverRecord, options: &SamplingOptions) -> bool {
	if options.require_dnssec && !record.supports_dnssec {
		return false;
	}
	if let Some(country) = &options.same_country {
		if !record.country_id.eq_ignore_ascii_case(country) {
			return false;
		}
	}
	record.reliability > options.min_reliability
}

/// Sample `options.sample_size` resolvers from distinct ASNs.
///
/// ASNs are drawn uniformly without replacement from the qualifying records,
/// then one record is drawn uniformly from each chosen ASN.
pub fn sample<R: Rng + ?Sized>(
	dataset: &[ResolverRecord],
	options: &SamplingOptions,
	rng: &mut R,
) -> Result<ResolverSet, CatalogError> {
	// Group by ASN, remembering the order ASNs were first seen so that a
	// seeded RNG yields the same set for the same dataset.
	let mut asn_order: Vec<&str> = Vec::new();
	let mut by_asn: HashMap<&str, Vec<&ResolverRecord>> = HashMap::new();
	for record in dataset.iter().filter(|r| qualifies(r, options)) {
		by_asn.entry(record.asn.as_str())
			.or_insert_with(|| {
				asn_order.push(record.asn.as_str());
				Vec::new()
			})
			.push(record);
	}

	let requested = options.sample_size;
	if requested == 0 || asn_order.len() < requested {
		return Err(CatalogError::InsufficientResolvers {
			requested,
			available: asn_order.len(),
		});
	}

	let resolvers: Vec<ResolverRecord> = asn_order
		.choose_multiple(rng, requested)
		.filter_map(|asn| by_asn.get(asn))
		.filter_map(|group| group.choose(rng))
		.map(|record| (*record).clone())
		.collect();

	debug!("sampled {} resolvers from {} qualifying ASNs", resolvers.len(), asn_order.len());
	Ok(ResolverSet { resolvers })
}
