use std::fmt;

use rustls::pki_types::CertificateDer;

/// Transport every dial goes over. TLS needs a connection-oriented stream,
/// and TCP is the only one dialed.
pub const TRANSPORT: Transport = Transport::Tcp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Transport {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            _ => Err(crate::Error::UnsupportedTransport(s.to_string())),
        }
    }
}

/// A dial target. Host and port are kept as given and checked when dialed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
    pub skip_verify: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: impl Into<String>, skip_verify: bool) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            skip_verify,
        }
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        join_host_port(&self.host, &self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Certificates in the order the peer sent them, leaf first.
///
/// Slots may be empty: a [`CertificateDialer`](crate::dial::CertificateDialer)
/// other than the network dialer is free to hand back holes, and the
/// exporter skips them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Option<CertificateDer<'static>>>,
}

impl CertificateChain {
    pub fn from_slots(certificates: Vec<Option<CertificateDer<'static>>>) -> Self {
        Self { certificates }
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = Option<&CertificateDer<'static>>> {
        self.certificates.iter().map(Option::as_ref)
    }

    pub fn certificates(&self) -> impl Iterator<Item = &CertificateDer<'static>> {
        self.certificates.iter().flatten()
    }

    pub fn leaf(&self) -> Option<&CertificateDer<'static>> {
        self.certificates().next()
    }
}

impl From<Vec<CertificateDer<'static>>> for CertificateChain {
    fn from(certificates: Vec<CertificateDer<'static>>) -> Self {
        Self {
            certificates: certificates.into_iter().map(Some).collect(),
        }
    }
}

impl From<&[CertificateDer<'_>]> for CertificateChain {
    fn from(certificates: &[CertificateDer<'_>]) -> Self {
        Self {
            certificates: certificates
                .iter()
                .map(|cert| Some(cert.clone().into_owned()))
                .collect(),
        }
    }
}
