//! UDP and TCP listeners on one local address, stopped together.

use super::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use dnsproxy_application::use_cases::HandleDnsQueryUseCase;
use dnsproxy_domain::DomainError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const UDP_RECV_BUFFER: usize = 4096;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Glue between raw transport bytes and the query use case.
#[derive(Clone)]
pub struct DnsServerHandler {
    use_case: Arc<HandleDnsQueryUseCase>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<HandleDnsQueryUseCase>) -> Self {
        Self { use_case }
    }

    pub async fn handle_raw(&self, query: &[u8], client: SocketAddr) -> Option<Vec<u8>> {
        debug!(client = %client, len = query.len(), "DNS query received");
        self.use_case.execute(query).await.into_reply()
    }
}

pub struct DnsListenerSet {
    udp: UdpSocket,
    tcp: TcpListener,
    handler: DnsServerHandler,
    tcp_idle_timeout: Duration,
}

impl DnsListenerSet {
    /// Binds both sockets. Nothing is served until [`serve`](Self::serve).
    pub fn bind(
        addr: SocketAddr,
        handler: DnsServerHandler,
        tcp_idle_timeout: Duration,
    ) -> Result<Self, DomainError> {
        let udp = create_udp_socket(addr)
            .map_err(|e| DomainError::Listener(format!("UDP bind on {} failed: {}", addr, e)))?;
        // An ephemeral request resolves to whatever UDP got, so both share it.
        let udp_addr = udp
            .local_addr()
            .map_err(|e| DomainError::Listener(e.to_string()))?;
        let tcp = create_tcp_listener(udp_addr).map_err(|e| {
            DomainError::Listener(format!("TCP bind on {} failed: {}", udp_addr, e))
        })?;

        Ok(Self {
            udp,
            tcp,
            handler,
            tcp_idle_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.udp
            .local_addr()
            .map_err(|e| DomainError::Listener(e.to_string()))
    }

    /// Runs both listeners until `shutdown` is cancelled or one of them fails.
    ///
    /// Either way the token ends up cancelled, both listeners stop and every
    /// in-flight query finishes before this returns. The first listener
    /// failure is the result.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), DomainError> {
        let local_addr = self.local_addr()?;
        info!(bind_address = %local_addr, "DNS listeners ready (UDP + TCP)");

        let mut listeners: JoinSet<Result<(), DomainError>> = JoinSet::new();
        listeners.spawn(run_udp_listener(
            self.udp,
            self.handler.clone(),
            shutdown.clone(),
        ));
        listeners.spawn(run_tcp_listener(
            self.tcp,
            self.handler,
            self.tcp_idle_timeout,
            shutdown.clone(),
        ));

        let result = supervise(listeners, &shutdown).await;

        info!(bind_address = %local_addr, "DNS listeners stopped");
        result
    }
}

/// Waits for every listener. The first failure cancels `shutdown` so the
/// others stop too, and is the result.
async fn supervise(
    mut listeners: JoinSet<Result<(), DomainError>>,
    shutdown: &CancellationToken,
) -> Result<(), DomainError> {
    let mut result = Ok(());
    while let Some(joined) = listeners.join_next().await {
        let outcome = joined
            .map_err(|e| DomainError::Listener(format!("listener task aborted: {}", e)))
            .and_then(|r| r);
        if let Err(e) = outcome {
            error!(error = %e, "DNS listener failed, stopping the others");
            shutdown.cancel();
            if result.is_ok() {
                result = Err(e);
            }
        }
    }
    result
}

async fn run_udp_listener(
    socket: UdpSocket,
    handler: DnsServerHandler,
    shutdown: CancellationToken,
) -> Result<(), DomainError> {
    let socket = Arc::new(socket);
    let mut in_flight = JoinSet::new();
    let mut recv_buf = [0u8; UDP_RECV_BUFFER];

    let result = loop {
        let (n, from) = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
            received = socket.recv_from(&mut recv_buf) => match received {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "Transient UDP receive error");
                    continue;
                }
                Err(e) => break Err(DomainError::Listener(format!("UDP receive failed: {}", e))),
            },
        };

        let query = recv_buf[..n].to_vec();
        let handler = handler.clone();
        let socket = socket.clone();
        in_flight.spawn(async move {
            if let Some(reply) = handler.handle_raw(&query, from).await {
                if let Err(e) = socket.send_to(&reply, from).await {
                    warn!(client = %from, error = %e, "Failed to send UDP reply");
                }
            }
        });
    };

    while in_flight.join_next().await.is_some() {}
    debug!("UDP listener drained");
    result
}

async fn run_tcp_listener(
    listener: TcpListener,
    handler: DnsServerHandler,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), DomainError> {
    let mut connections = JoinSet::new();

    let result = loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) || is_fd_exhaustion(&e) => {
                    warn!(error = %e, "TCP accept failed, retrying");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
                Err(e) => break Err(DomainError::Listener(format!("TCP accept failed: {}", e))),
            },
        };

        connections.spawn(handle_tcp_connection(
            stream,
            peer,
            handler.clone(),
            idle_timeout,
            shutdown.clone(),
        ));
    };

    while connections.join_next().await.is_some() {}
    debug!("TCP listener drained");
    result
}

/// Serves framed queries in order until the peer closes, goes idle, or
/// shutdown is requested between queries.
async fn handle_tcp_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: DnsServerHandler,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let query = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = tokio::time::timeout(idle_timeout, read_with_length_prefix(&mut stream)) => match read {
                Ok(Ok(Some(query))) => query,
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    debug!(client = %peer, error = %e, "TCP read failed");
                    break;
                }
                Err(_) => {
                    debug!(client = %peer, "TCP connection idle, closing");
                    break;
                }
            },
        };

        if let Some(reply) = handler.handle_raw(&query, peer).await {
            if let Err(e) = send_with_length_prefix(&mut stream, &reply).await {
                warn!(client = %peer, error = %e, "Failed to send TCP reply");
                break;
            }
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

fn is_fd_exhaustion(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(libc::EMFILE) | Some(libc::ENFILE))
}

fn create_udp_socket(socket_addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(domain_of(socket_addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

fn create_tcp_listener(socket_addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(domain_of(socket_addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

fn domain_of(socket_addr: SocketAddr) -> Domain {
    if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}
