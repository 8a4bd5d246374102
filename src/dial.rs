use crate::error::{Error, Result};
use crate::types::{CertificateChain, Endpoint, TRANSPORT};
use crate::validate::{is_blank, validate_port};
use log::{debug, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

/// Anything that can hand back a peer's certificate chain.
///
/// The target is bound when the implementor is built, so `dial` takes no
/// arguments.
pub trait CertificateDialer {
    fn dial(&self) -> Result<CertificateChain>;
}

impl<D: CertificateDialer + ?Sized> CertificateDialer for &D {
    fn dial(&self) -> Result<CertificateChain> {
        (**self).dial()
    }
}

impl<D: CertificateDialer + ?Sized> CertificateDialer for Box<D> {
    fn dial(&self) -> Result<CertificateChain> {
        (**self).dial()
    }
}

/// Dials an [`Endpoint`] over TLS and returns what the server presented.
#[derive(Debug, Clone)]
pub struct TlsDialer {
    endpoint: Endpoint,
    extra_roots: Vec<CertificateDer<'static>>,
}

impl TlsDialer {
    pub fn new(host: impl Into<String>, port: impl Into<String>, skip_verify: bool) -> Self {
        Self::from_endpoint(Endpoint::new(host, port, skip_verify))
    }

    pub fn from_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            extra_roots: Vec::new(),
        }
    }

    /// Trust these anchors in addition to the bundled web roots. Ignored
    /// when verification is skipped.
    pub fn with_root_certificates(mut self, roots: Vec<CertificateDer<'static>>) -> Self {
        self.extra_roots.extend(roots);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn client_config(&self) -> Result<ClientConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder =
            ClientConfig::builder_with_provider(provider.clone()).with_safe_default_protocol_versions()?;

        let config = if self.endpoint.skip_verify {
            warn!(
                "certificate verification disabled for {}",
                self.endpoint.address()
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
                .with_no_client_auth()
        } else {
            builder
                .with_root_certificates(self.root_store())
                .with_no_client_auth()
        };

        Ok(config)
    }

    fn root_store(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if !self.extra_roots.is_empty() {
            let (added, ignored) = roots.add_parsable_certificates(self.extra_roots.iter().cloned());
            debug!("added {} extra trust anchors", added);
            if ignored > 0 {
                warn!("ignored {} unparsable trust anchors", ignored);
            }
        }

        roots
    }
}

impl CertificateDialer for TlsDialer {
    fn dial(&self) -> Result<CertificateChain> {
        let Endpoint { host, port, .. } = &self.endpoint;

        validate_port(port).map_err(|source| Error::InvalidPort {
            port: port.clone(),
            source,
        })?;

        if is_blank(host) {
            return Err(Error::EmptyHost);
        }

        let server_name =
            ServerName::try_from(host.clone()).map_err(|source| Error::InvalidServerName {
                host: host.clone(),
                source,
            })?;

        let addr = self.endpoint.address();
        let conn = ClientConnection::new(Arc::new(self.client_config()?), server_name)?;

        debug!("dialing {}://{}", TRANSPORT, addr);
        let sock = TcpStream::connect(&addr).map_err(|source| dial_error(&addr, source))?;

        let mut session = Session { conn, sock };
        let result = session
            .handshake()
            .map_err(|source| dial_error(&addr, source))
            .and_then(|()| session.peer_chain(&addr));

        Error::merge_close(result, &addr, session.close())
    }
}

fn dial_error(addr: &str, source: io::Error) -> Error {
    Error::Dial {
        transport: TRANSPORT,
        addr: addr.to_string(),
        source,
    }
}

/// One connection's TLS state and socket. Dropping it closes the socket;
/// [`Session::close`] does the same but reports failures.
struct Session {
    conn: ClientConnection,
    sock: TcpStream,
}

impl Session {
    fn handshake(&mut self) -> io::Result<()> {
        while self.conn.is_handshaking() {
            self.conn.complete_io(&mut self.sock)?;
        }

        debug!(
            "handshake complete: {:?} {:?}",
            self.conn.protocol_version(),
            self.conn.negotiated_cipher_suite().map(|s| s.suite())
        );
        Ok(())
    }

    fn peer_chain(&self, addr: &str) -> Result<CertificateChain> {
        match self.conn.peer_certificates() {
            Some(certs) if !certs.is_empty() => {
                debug!("{} presented {} certificates", addr, certs.len());
                Ok(CertificateChain::from(certs))
            }
            _ => Err(Error::NoCertsReturned(addr.to_string())),
        }
    }

    fn close(mut self) -> io::Result<()> {
        // close_notify only means something on an established session
        if !self.conn.is_handshaking() {
            self.conn.send_close_notify();
            while self.conn.wants_write() {
                self.conn.write_tls(&mut self.sock)?;
            }
        }

        match self.sock.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Accepts whatever chain the server presents. Handshake signatures are
/// still checked against the presented leaf.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
