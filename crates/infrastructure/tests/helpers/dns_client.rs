use async_trait::async_trait;
use dnsproxy_application::ports::UpstreamExchanger;
use dnsproxy_domain::DomainError;
use dnsproxy_infrastructure::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};

pub fn query_bytes(id: u16, name: &str, record_type: RecordType) -> Vec<u8> {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_ascii(name).unwrap(), record_type));
    message.to_vec().unwrap()
}

/// Sends one datagram and waits up to `wait` for the answer.
pub async fn udp_query(server: SocketAddr, query: &[u8], wait: Duration) -> Option<Message> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(query, server).await.unwrap();

    let mut buf = vec![0u8; 4096];
    match tokio::time::timeout(wait, socket.recv_from(&mut buf)).await {
        Ok(Ok((n, _))) => Some(Message::from_vec(&buf[..n]).unwrap()),
        _ => None,
    }
}

/// Sends every query on one connection, then reads as many answers as arrive
/// within `wait`.
pub async fn tcp_query(server: SocketAddr, queries: &[Vec<u8>], wait: Duration) -> Vec<Message> {
    let mut stream = TcpStream::connect(server).await.unwrap();
    for query in queries {
        send_with_length_prefix(&mut stream, query).await.unwrap();
    }

    let mut replies = Vec::new();
    while replies.len() < queries.len() {
        match tokio::time::timeout(wait, read_with_length_prefix(&mut stream)).await {
            Ok(Ok(Some(bytes))) => replies.push(Message::from_vec(&bytes).unwrap()),
            _ => break,
        }
    }
    replies
}

/// Upstream that answers every question with one A record.
#[derive(Clone)]
pub struct StaticUpstream {
    addr: Ipv4Addr,
    calls: Arc<AtomicUsize>,
}

impl StaticUpstream {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn answer(query: &[u8], addr: Ipv4Addr) -> Vec<u8> {
        let request = Message::from_vec(query).unwrap();
        let mut reply = Message::new();
        reply
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true);
        for query in request.queries() {
            reply.add_query(query.clone());
            reply.add_answer(Record::from_rdata(query.name().clone(), 60, RData::A(A(addr))));
        }
        reply.to_vec().unwrap()
    }
}

#[async_trait]
impl UpstreamExchanger for StaticUpstream {
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::answer(query, self.addr))
    }

    fn server(&self) -> String {
        "static-upstream".to_string()
    }
}
