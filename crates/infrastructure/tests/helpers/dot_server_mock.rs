use super::dns_client::StaticUpstream;
use dnsproxy_infrastructure::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

pub const TLS_NAME: &str = "dns.test";

#[derive(Debug, Clone, Copy)]
pub enum DotBehavior {
    /// Reply with one A record.
    Answer(Ipv4Addr),
    /// Complete the handshake, read the query, close.
    CloseWithoutReply,
    /// Accept TCP but never speak TLS.
    BlackHole,
}

/// DNS-over-TLS server on loopback with a throwaway self-signed certificate.
pub struct MockDotServer {
    addr: SocketAddr,
    client_config: Arc<rustls::ClientConfig>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDotServer {
    pub async fn start(behavior: DotBehavior) -> Self {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let certified = rcgen::generate_simple_self_signed(vec![TLS_NAME.to_string()]).unwrap();
        let cert: CertificateDer<'static> = certified.cert.der().clone();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            certified.key_pair.serialize_der(),
        ));

        let server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert.clone()], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(server_config));

        let mut roots = rustls::RootCertStore::empty();
        roots.add(cert).unwrap();
        let client_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let (stream, _) = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok(accepted) => accepted,
                        Err(_) => break,
                    },
                };

                if let DotBehavior::BlackHole = behavior {
                    held.push(stream);
                    continue;
                }

                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let Ok(Some(query)) = read_with_length_prefix(&mut tls).await else {
                        return;
                    };
                    if let DotBehavior::Answer(addr) = behavior {
                        let reply = StaticUpstream::answer(&query, addr);
                        let _ = send_with_length_prefix(&mut tls, &reply).await;
                    }
                });
            }
        });

        Self {
            addr,
            client_config,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Client config trusting only this server's certificate.
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        self.client_config.clone()
    }

    pub fn tls_name(&self) -> String {
        TLS_NAME.to_string()
    }
}

impl Drop for MockDotServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
