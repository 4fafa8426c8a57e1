use std::future::Future;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use log::debug;
use tokio::process::Command;

use crate::error::ProbeError;

/// Measures last-mile latency to a resolved address.
pub trait RttProbe: Send + Sync {
	fn probe(&self, addr: IpAddr) -> impl Future<Output = Result<Duration, ProbeError>> + Send;
}

/// Average round-trip time reported by the OS `ping` utility
#[derive(Debug, Clone, Copy)]
pub struct PingProbe {
	pub count: u32,
}

impl Default for PingProbe {
	fn default() -> Self {
		PingProbe { count: 3 }
	}
}

impl RttProbe for PingProbe {
	async fn probe(&self, addr: IpAddr) -> Result<Duration, ProbeError> {
		let count_flag = if cfg!(windows) { "-n" } else { "-c" };
		let output = Command::new("ping")
			.arg(count_flag)
			.arg(self.count.to_string())
			.arg(addr.to_string())
			.kill_on_drop(true)
			.output()
			.await?;
		let text = String::from_utf8_lossy(&output.stdout);
		debug!("ping {}: {}", addr, text.trim());
		parse_ping_average(&text).ok_or(ProbeError::Unparsable)
	}
}

/// Extract the average RTT from a ping summary.
///
/// Understands the Unix `rtt min/avg/max/mdev = a/b/c/d ms` line (also the
/// BSD `round-trip` spelling) and the Windows `Average = Nms` line.
pub fn parse_ping_average(output: &str) -> Option<Duration> {
	for line in output.lines() {
		let line = line.trim();
		if line.contains("min/avg/max") {
			let values = line.split('=').nth(1)?;
			let avg = values.trim().split('/').nth(1)?;
			return millis(avg.trim());
		}
		if let Some(pos) = line.find("Average = ") {
			let rest = &line[pos + "Average = ".len()..];
			return millis(rest.trim_end_matches("ms").trim());
		}
	}
	None
}

fn millis(value: &str) -> Option<Duration> {
	let ms: f64 = value.parse().ok()?;
	if !ms.is_finite() || ms < 0.0 {
		return None;
	}
	Some(Duration::from_secs_f64(ms / 1000.0))
}

/// Time to a 200 response for a plain GET to the address
pub struct HttpProbe {
	client: reqwest::Client,
}

impl HttpProbe {
	pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
		// Bare IP addresses never match a certificate name
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.danger_accept_invalid_certs(true)
			.build()?;
		Ok(HttpProbe { client })
	}

	async fn timed_get(&self, url: &str) -> Result<Duration, ProbeError> {
		let start = Instant::now();
		let response = self.client.get(url).send().await?;
		let elapsed = start.elapsed();
		let status = response.status();
		if status != reqwest::StatusCode::OK {
			return Err(ProbeError::Status(status.as_u16()));
		}
		Ok(elapsed)
	}
}

impl RttProbe for HttpProbe {
	async fn probe(&self, addr: IpAddr) -> Result<Duration, ProbeError> {
		let host = match addr {
			IpAddr::V4(v4) => v4.to_string(),
			IpAddr::V6(v6) => format!("[{}]", v6),
		};
		match self.timed_get(&format!("http://{}/", host)).await {
			Ok(elapsed) => Ok(elapsed),
			Err(e) => {
				debug!("http probe to {} failed ({}), trying https", host, e);
				self.timed_get(&format!("https://{}/", host)).await
			}
		}
	}
}
