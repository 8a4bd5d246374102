use std::io;
use std::num::ParseIntError;
use thiserror::Error;

use crate::types::Transport;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid port {port:?}: {source}")]
    InvalidPort {
        port: String,
        #[source]
        source: PortError,
    },

    #[error("host cannot be empty string")]
    EmptyHost,

    #[error("unsupported transport {0:?}, only tcp is supported")]
    UnsupportedTransport(String),

    #[error("invalid server name {host:?}: {source}")]
    InvalidServerName {
        host: String,
        #[source]
        source: rustls::pki_types::InvalidDnsNameError,
    },

    #[error("TLS configuration error: {0}")]
    Config(#[from] rustls::Error),

    #[error("unable to dial {transport}://{addr}: {source}")]
    Dial {
        transport: Transport,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no TLS certificates were returned by {0}")]
    NoCertsReturned(String),

    #[error("failed to write PEM output: {0}")]
    Write(#[source] io::Error),

    #[error("{}", close_message(.addr, .prior, .source))]
    Close {
        addr: String,
        prior: Option<Box<Error>>,
        #[source]
        source: io::Error,
    },

    #[error("PEM parsing error: {0}")]
    Pem(#[from] pem::PemError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("not a number: {0}")]
    NotANumber(#[source] ParseIntError),

    #[error("{0} is out of range, port number should be <= 65535 and >= 1")]
    OutOfRange(i64),
}

impl Error {
    /// The error that decided the outcome, looking through a close failure
    /// at whatever was already being returned.
    pub fn primary(&self) -> &Error {
        match self {
            Error::Close {
                prior: Some(prior), ..
            } => prior.primary(),
            other => other,
        }
    }

    pub fn is_no_certs(&self) -> bool {
        matches!(self.primary(), Error::NoCertsReturned(_))
    }

    pub fn is_dial_failure(&self) -> bool {
        matches!(self.primary(), Error::Dial { .. })
    }

    /// Folds the outcome of releasing a connection into the result of the
    /// work done on it. Neither error is dropped.
    pub(crate) fn merge_close<T>(
        result: Result<T>,
        addr: &str,
        closed: io::Result<()>,
    ) -> Result<T> {
        match (result, closed) {
            (result, Ok(())) => result,
            (Ok(_), Err(source)) => Err(Error::Close {
                addr: addr.to_string(),
                prior: None,
                source,
            }),
            (Err(prior), Err(source)) => Err(Error::Close {
                addr: addr.to_string(),
                prior: Some(Box::new(prior)),
                source,
            }),
        }
    }
}

fn close_message(addr: &str, prior: &Option<Box<Error>>, source: &io::Error) -> String {
    match prior {
        Some(prior) => format!("{prior}; also failed to close connection to {addr}: {source}"),
        None => format!("failed to close connection to {addr}: {source}"),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_close_keeps_both_errors() {
        let prior: Result<()> = Err(Error::NoCertsReturned("example.com:443".to_string()));
        let closed = Err(io::Error::new(io::ErrorKind::Other, "boom"));

        let err = Error::merge_close(prior, "example.com:443", closed).unwrap_err();

        assert!(matches!(err, Error::Close { prior: Some(_), .. }));
        assert!(err.is_no_certs());
        let msg = err.to_string();
        assert!(msg.contains("no TLS certificates"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_merge_close_fails_successful_result() {
        let closed = Err(io::Error::new(io::ErrorKind::Other, "reset"));
        let err = Error::merge_close(Ok(1), "127.0.0.1:8443", closed).unwrap_err();

        assert!(matches!(err, Error::Close { prior: None, .. }));
        assert!(!err.is_no_certs());
        assert_eq!(
            err.to_string(),
            "failed to close connection to 127.0.0.1:8443: reset"
        );
    }

    #[test]
    fn test_merge_close_passes_through_clean_close() {
        let ok = Error::merge_close(Ok("chain"), "host:1", Ok(())).unwrap();
        assert_eq!(ok, "chain");

        let err = Error::merge_close::<()>(Err(Error::EmptyHost), "host:1", Ok(())).unwrap_err();
        assert!(matches!(err, Error::EmptyHost));
    }
}
