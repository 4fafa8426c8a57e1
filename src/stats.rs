/// Summary of one timing series, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesStats {
	pub mean: f64,
	pub p50: f64,
	pub stddev: f64,
}

/// Calculate the p-th percentile from a sorted slice using nearest-rank method.
///
/// Args:
///   sorted_values: Pre-sorted slice of f64 values.
///   p: Percentile between 0.0 and 100.0 (e.g. 50.0 for median).
///
/// Returns:
///   None if the slice is empty, otherwise the percentile value.
pub fn percentile(sorted_values: &[f64], p: f64) -> Option<f64> {
	if sorted_values.is_empty() {
		return None;
	}
	// Nearest-rank: rank = ceil(p/100 * N), clamped to [1, N]
	let n = sorted_values.len();
	let rank = ((p / 100.0) * n as f64).ceil() as usize;
	let rank = rank.clamp(1, n);
	Some(sorted_values[rank - 1])
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the population standard deviation of a slice of values.
pub fn stddev(values: &[f64]) -> Option<f64> {
	let avg = mean(values)?;
	let variance = values.iter()
		.map(|v| (v - avg).powi(2))
		.sum::<f64>() / values.len() as f64;
	Some(variance.sqrt())
}

/// Summarize a timing series; an empty series yields all zeros.
pub fn summarize(values: &[f64]) -> SeriesStats {
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	SeriesStats {
		mean: mean(&sorted).unwrap_or(0.0),
		p50: percentile(&sorted, 50.0).unwrap_or(0.0),
		stddev: stddev(&sorted).unwrap_or(0.0),
	}
}
