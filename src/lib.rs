//! certdump - grab the certificate chain a TLS server presents
//!
//! Connects to a host over TLS, completes the handshake and writes the
//! certificates the peer sent, leaf first, as a PEM bundle.
//!
//! - Port and host checks run before any socket is opened
//! - Verification can be skipped to inspect self-signed or broken servers
//! - Output goes to any [`std::io::Write`], and is only written once the
//!   whole bundle is encoded
//!
//! # Examples
//!
//! ## Dumping a server's chain to stdout
//!
//! ```no_run
//! use certdump::{export, TlsDialer};
//!
//! let dialer = TlsDialer::new("example.com", "443", false);
//! export(&dialer, &mut std::io::stdout()).unwrap();
//! ```
//!
//! ## Trusting a private CA
//!
//! ```no_run
//! use certdump::{parse_certificates, CertificateDialer, TlsDialer};
//!
//! let roots = parse_certificates(&std::fs::read_to_string("ca.pem").unwrap()).unwrap();
//! let chain = TlsDialer::new("internal.example", "8443", false)
//!     .with_root_certificates(roots)
//!     .dial()
//!     .unwrap();
//! println!("{} certificates", chain.len());
//! ```

pub mod dial;
pub mod error;
pub mod export;
pub mod types;
pub mod validate;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, PortError, Result};

pub use dial::{CertificateDialer, TlsDialer};
pub use export::{encode_pem, export, parse_certificates, FanOut};
pub use types::{CertificateChain, Endpoint, Transport, TRANSPORT};
pub use validate::{is_blank, validate_port};
