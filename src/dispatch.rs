use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

use crate::catalog::ResolverSet;
use crate::dns::{build_query, parse_response, ResponseError};
use crate::transport::{Answer, DispatchOptions, QueryError, QueryResult};

/// Something that can ask one specific resolver for a domain's address.
pub trait DnsQuerier: Send + Sync + 'static {
	fn query(
		&self,
		domain: &str,
		resolver: IpAddr,
		timeout: Duration,
	) -> impl Future<Output = Result<Answer, QueryError>> + Send;
}

/// Plain DNS over UDP to port 53 of the resolver, one socket per query
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpQuerier;

impl DnsQuerier for UdpQuerier {
	async fn query(
		&self,
		domain: &str,
		resolver: IpAddr,
		timeout: Duration,
	) -> Result<Answer, QueryError> {
		send_udp_query(SocketAddr::new(resolver, 53), domain, timeout).await
	}
}

/// Send a single A query over UDP and wait for the matching answer.
///
/// A dedicated socket per query avoids response stealing between concurrent
/// tasks; it is closed when this future completes or is dropped.
async fn send_udp_query(
	resolver: SocketAddr,
	domain: &str,
	timeout: Duration,
) -> Result<Answer, QueryError> {
	let txid: u16 = rand::random();
	let query_bytes = build_query(domain, txid)?;

	let bind_addr = if resolver.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr).await
		.map_err(|e| QueryError::NoNameservers(format!("bind failed: {}", e)))?;

	let start = Instant::now();
	socket.send_to(&query_bytes, resolver).await
		.map_err(|e| QueryError::NoNameservers(format!("send to {} failed: {}", resolver, e)))?;

	// Use 4096-byte buffer to handle EDNS-extended responses
	let mut buf = vec![0u8; 4096];
	loop {
		let elapsed = start.elapsed();
		if elapsed >= timeout {
			return Err(QueryError::Timeout);
		}
		let remaining = timeout - elapsed;

		match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
			Ok(Ok((len, src))) => {
				if src != resolver {
					continue;
				}
				match parse_response(&buf[..len], txid) {
					Ok(address) => {
						return Ok(Answer { address, latency: start.elapsed() });
					}
					// Stray or spoofed datagram, keep waiting for ours
					Err(ResponseError::Mismatch(_)) => continue,
					Err(ResponseError::Failed(e)) => return Err(e),
				}
			}
			Ok(Err(e)) => {
				return Err(QueryError::NoNameservers(format!("receive from {} failed: {}", resolver, e)));
			}
			Err(_) => return Err(QueryError::Timeout),
		}
	}
}

/// Query every resolver in the set for `domain` and wait for all of them.
///
/// At most `max_inflight` queries run at once. Each query is bounded by
/// `options.timeout` regardless of the querier. Results come back in
/// resolver-set order, one per resolver, and a failing resolver never
/// affects its siblings.
pub async fn dispatch<Q: DnsQuerier>(
	querier: &Arc<Q>,
	domain: &str,
	resolvers: &ResolverSet,
	options: &DispatchOptions,
) -> Vec<QueryResult> {
	let permits = options.max_inflight
		.unwrap_or(resolvers.len())
		.max(1);
	let semaphore = Arc::new(Semaphore::new(permits));
	let timeout = options.timeout;

	let mut handles = Vec::with_capacity(resolvers.len());
	for resolver in resolvers.ips() {
		let sem = semaphore.clone();
		let querier = querier.clone();
		let domain = domain.to_string();

		let handle = tokio::spawn(async move {
			let _permit = match sem.acquire_owned().await {
				Ok(permit) => permit,
				Err(_) => return Err(QueryError::Resolution("dispatcher shut down".to_string())),
			};
			match tokio::time::timeout(timeout, querier.query(&domain, resolver, timeout)).await {
				Ok(outcome) => outcome,
				Err(_) => Err(QueryError::Timeout),
			}
		});
		handles.push((resolver, handle));
	}

	let mut results = Vec::with_capacity(handles.len());
	for (resolver, handle) in handles {
		let outcome = match handle.await {
			Ok(outcome) => outcome,
			Err(e) => Err(QueryError::Resolution(format!("query task failed: {}", e))),
		};
		if let Err(e) = &outcome {
			debug!("{} via {}: {}", domain, resolver, e);
		}
		results.push(QueryResult {
			resolver,
			domain: domain.to_string(),
			outcome,
		});
	}
	results
}
