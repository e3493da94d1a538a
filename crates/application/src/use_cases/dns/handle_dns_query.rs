use crate::ports::UpstreamExchanger;
use crate::services::OverrideTable;
use dnsproxy_domain::DomainError;
use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::Record;
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What the dispatcher decided for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Synthesized from the override table.
    Answered(Vec<u8>),
    /// Upstream reply, byte for byte.
    Relayed(Vec<u8>),
    /// FORMERR, NOTIMP or REFUSED built locally.
    Rejected(Vec<u8>),
    /// Nothing is sent back.
    Dropped,
}

impl QueryOutcome {
    pub fn into_reply(self) -> Option<Vec<u8>> {
        match self {
            Self::Answered(bytes) | Self::Relayed(bytes) | Self::Rejected(bytes) => Some(bytes),
            Self::Dropped => None,
        }
    }
}

pub struct HandleDnsQueryUseCase {
    overrides: Arc<OverrideTable>,
    upstream: Arc<dyn UpstreamExchanger>,
}

impl HandleDnsQueryUseCase {
    pub fn new(overrides: Arc<OverrideTable>, upstream: Arc<dyn UpstreamExchanger>) -> Self {
        Self {
            overrides,
            upstream,
        }
    }

    pub async fn execute(&self, query_bytes: &[u8]) -> QueryOutcome {
        let request = match Message::from_vec(query_bytes) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, len = query_bytes.len(), "Malformed query");
                return reject_undecodable(query_bytes);
            }
        };

        if request.message_type() != MessageType::Query {
            debug!(id = request.id(), "Ignoring response message");
            return QueryOutcome::Dropped;
        }

        if request.op_code() != OpCode::Query {
            debug!(id = request.id(), op_code = ?request.op_code(), "Unsupported opcode");
            return reject(&request, ResponseCode::NotImp);
        }

        let Some(query) = request.queries().first() else {
            debug!(id = request.id(), "Query without question");
            return reject(&request, ResponseCode::Refused);
        };

        match self.overrides.lookup(query.name()) {
            Some(record) => {
                debug!(
                    domain = %query.name(),
                    record_type = ?query.query_type(),
                    answer = ?record.record_type(),
                    "Answering from override table"
                );
                match override_reply(&request, record) {
                    Ok(bytes) => QueryOutcome::Answered(bytes),
                    Err(e) => {
                        error!(error = %e, domain = %query.name(), "Failed to encode override reply");
                        QueryOutcome::Dropped
                    }
                }
            }
            None => {
                debug!(domain = %query.name(), record_type = ?query.query_type(), "Forwarding upstream");
                match self.forward(query_bytes, request.id()).await {
                    Ok(reply) => QueryOutcome::Relayed(reply),
                    Err(e) => {
                        warn!(
                            error = %e,
                            domain = %query.name(),
                            upstream = %self.upstream.server(),
                            "Upstream exchange failed, query left unanswered"
                        );
                        QueryOutcome::Dropped
                    }
                }
            }
        }
    }

    async fn forward(&self, query_bytes: &[u8], id: u16) -> Result<Vec<u8>, DomainError> {
        let reply = self.upstream.exchange(query_bytes).await?;

        let message = Message::from_vec(&reply)
            .map_err(|e| DomainError::InvalidDnsResponse(format!("undecodable reply: {}", e)))?;
        if message.id() != id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "reply id {} does not match query id {}",
                message.id(),
                id
            )));
        }

        Ok(reply)
    }
}

/// Mirrors the request header and first question, answers with `record` only.
fn override_reply(request: &Message, record: &Record) -> Result<Vec<u8>, DomainError> {
    let mut reply = Message::new();
    reply.set_header(Header::response_from_request(request.header()));
    if let Some(query) = request.queries().first() {
        reply.add_query(query.clone());
    }
    reply.add_answer(record.clone());
    encode_uncompressed(&reply)
}

fn reject(request: &Message, code: ResponseCode) -> QueryOutcome {
    let mut reply = Message::new();
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(code);
    reply.set_header(header);
    if let Some(query) = request.queries().first() {
        reply.add_query(query.clone());
    }

    match encode_uncompressed(&reply) {
        Ok(bytes) => QueryOutcome::Rejected(bytes),
        Err(e) => {
            error!(error = %e, "Failed to encode error reply");
            QueryOutcome::Dropped
        }
    }
}

/// FORMERR when at least the header is readable, silence otherwise.
fn reject_undecodable(query_bytes: &[u8]) -> QueryOutcome {
    let mut decoder = BinDecoder::new(query_bytes);
    let header = match Header::read(&mut decoder) {
        Ok(header) if header.message_type() == MessageType::Query => header,
        _ => return QueryOutcome::Dropped,
    };

    let mut response_header = Header::response_from_request(&header);
    response_header.set_response_code(ResponseCode::FormErr);
    let mut reply = Message::new();
    reply.set_header(response_header);

    match encode_uncompressed(&reply) {
        Ok(bytes) => QueryOutcome::Rejected(bytes),
        Err(_) => QueryOutcome::Dropped,
    }
}

/// Encodes with name compression disabled.
pub fn encode_uncompressed(message: &Message) -> Result<Vec<u8>, DomainError> {
    let mut buffer = Vec::with_capacity(512);
    {
        let mut encoder = BinEncoder::new(&mut buffer);
        encoder.set_canonical_names(true);
        message
            .emit(&mut encoder)
            .map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))?;
    }
    Ok(buffer)
}
