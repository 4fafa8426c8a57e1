use std::net::IpAddr;

use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::transport::QueryError;

/// Build an A query for `domain` with recursion desired.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_query(domain: &str, txid: u16) -> Result<Vec<u8>, QueryError> {
	let name = Name::from_ascii(domain)
		.map_err(|e| QueryError::Resolution(format!("invalid domain name '{}': {}", domain, e)))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));

	message.to_vec()
		.map_err(|e| QueryError::Resolution(format!("failed to serialize DNS query: {}", e)))
}

/// Why a datagram could not be turned into an address
#[derive(Debug, PartialEq, Eq)]
pub enum ResponseError {
	/// Not a response to our query; keep listening
	Mismatch(String),
	/// A genuine answer that carries no usable address
	Failed(QueryError),
}

/// Parse a DNS response and return the first A record in the answer section.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<IpAddr, ResponseError> {
	let message = Message::from_vec(bytes)
		.map_err(|e| ResponseError::Mismatch(format!("failed to parse DNS response: {}", e)))?;

	if message.id() != expected_txid {
		return Err(ResponseError::Mismatch(format!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		)));
	}

	if message.message_type() != MessageType::Response {
		return Err(ResponseError::Mismatch("received a query instead of a response".to_string()));
	}

	let rcode = message.response_code();
	if rcode != ResponseCode::NoError {
		return Err(ResponseError::Failed(QueryError::Resolution(format!("rcode {}", rcode))));
	}

	message.answers().iter()
		.find_map(|record| match record.data() {
			RData::A(a) => Some(IpAddr::V4(a.0)),
			_ => None,
		})
		.ok_or_else(|| ResponseError::Failed(QueryError::Resolution("no A record in answer".to_string())))
}
