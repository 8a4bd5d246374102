use crate::dial::CertificateDialer;
use crate::error::{Error, Result};
use log::{debug, info};
use pem::{EncodeConfig, LineEnding, Pem};
use rustls::pki_types::CertificateDer;
use std::io::{self, Write};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Dials, encodes every certificate in the returned chain as PEM and writes
/// the whole bundle to `sink`.
///
/// Dial errors come back untouched. Nothing is written unless at least one
/// certificate was encoded, and the sink only sees one `write_all`.
pub fn export<D, W>(dialer: &D, sink: &mut W) -> Result<()>
where
    D: CertificateDialer + ?Sized,
    W: Write + ?Sized,
{
    let chain = dialer.dial()?;

    let mut bundle = String::new();
    let mut count = 0;
    for (idx, slot) in chain.slots().enumerate() {
        match slot {
            Some(cert) => {
                bundle.push_str(&encode_pem(cert));
                count += 1;
            }
            None => debug!("skipping absent certificate at position {}", idx),
        }
    }

    if bundle.is_empty() {
        return Err(Error::NoCertsReturned("the remote peer".to_string()));
    }

    sink.write_all(bundle.as_bytes()).map_err(Error::Write)?;
    sink.flush().map_err(Error::Write)?;

    info!("exported {} certificates", count);
    Ok(())
}

/// One `CERTIFICATE` block, 64-column base64 and LF line endings.
pub fn encode_pem(cert: &CertificateDer<'_>) -> String {
    let block = Pem::new(CERTIFICATE_LABEL, cert.as_ref());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Every `CERTIFICATE` block in `text`; blocks with other labels are skipped.
pub fn parse_certificates(text: &str) -> Result<Vec<CertificateDer<'static>>> {
    let certs = pem::parse_many(text)?
        .into_iter()
        .filter(|block| block.tag() == CERTIFICATE_LABEL)
        .map(|block| CertificateDer::from(block.into_contents()))
        .collect();

    Ok(certs)
}

/// Writes everything to both `first` and `second`.
#[derive(Debug)]
pub struct FanOut<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> FanOut<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for FanOut<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CertificateChain;

    struct StubDialer(CertificateChain);

    impl CertificateDialer for StubDialer {
        fn dial(&self) -> Result<CertificateChain> {
            Ok(self.0.clone())
        }
    }

    struct FailingDialer;

    impl CertificateDialer for FailingDialer {
        fn dial(&self) -> Result<CertificateChain> {
            Err(Error::EmptyHost)
        }
    }

    /// Accepts `limit` bytes and then fails.
    struct ShortSink {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for ShortSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.written.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "sink full"));
            }
            let n = room.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_cert() -> CertificateDer<'static> {
        rcgen::generate_simple_self_signed(vec!["export.test".to_string()])
            .unwrap()
            .cert
            .der()
            .clone()
    }

    #[test]
    fn test_all_absent_chain_writes_nothing() {
        let dialer = StubDialer(CertificateChain::from_slots(vec![None]));
        let mut out = Vec::new();

        let err = export(&dialer, &mut out).unwrap_err();

        assert!(matches!(err, Error::NoCertsReturned(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_chain_is_an_error() {
        let dialer = StubDialer(CertificateChain::default());
        let mut out = Vec::new();

        assert!(export(&dialer, &mut out).unwrap_err().is_no_certs());
        assert!(out.is_empty());
    }

    #[test]
    fn test_dial_error_is_returned_unchanged() {
        let mut out = Vec::new();
        let err = export(&FailingDialer, &mut out).unwrap_err();

        assert!(matches!(err, Error::EmptyHost));
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_certificate_decodes_to_original_der() {
        let cert = test_cert();
        let dialer = StubDialer(CertificateChain::from(vec![cert.clone()]));
        let mut out = Vec::new();

        export(&dialer, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(text.ends_with("-----END CERTIFICATE-----\n"));
        assert!(!text.contains('\r'));
        assert!(text.lines().all(|line| line.len() <= 64));

        let blocks = pem::parse_many(&text).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag(), "CERTIFICATE");
        assert_eq!(blocks[0].contents(), cert.as_ref());
    }

    #[test]
    fn test_holes_are_skipped_and_order_kept() {
        let leaf = test_cert();
        let intermediate = test_cert();
        let dialer = StubDialer(CertificateChain::from_slots(vec![
            Some(leaf.clone()),
            None,
            Some(intermediate.clone()),
        ]));
        let mut out = Vec::new();

        export(&dialer, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, encode_pem(&leaf) + &encode_pem(&intermediate));
        assert_eq!(parse_certificates(&text).unwrap(), vec![leaf, intermediate]);
    }

    #[test]
    fn test_short_write_is_reported() {
        let dialer = StubDialer(CertificateChain::from(vec![test_cert()]));
        let mut sink = ShortSink {
            written: Vec::new(),
            limit: 10,
        };

        let err = export(&dialer, &mut sink).unwrap_err();
        assert!(matches!(err, Error::Write(_)));
    }

    #[test]
    fn test_fan_out_writes_to_both() {
        let cert = test_cert();
        let dialer = StubDialer(CertificateChain::from(vec![cert.clone()]));
        let mut fan = FanOut::new(Vec::new(), Vec::new());

        export(&dialer, &mut fan).unwrap();

        let (a, b) = fan.into_inner();
        assert_eq!(a, b);
        assert_eq!(a, encode_pem(&cert).into_bytes());
    }

    #[test]
    fn test_parse_certificates_skips_other_labels() {
        let cert = test_cert();
        let key = Pem::new("PRIVATE KEY", vec![1, 2, 3]);
        let text = format!("{}{}", pem::encode(&key), encode_pem(&cert));

        assert_eq!(parse_certificates(&text).unwrap(), vec![cert]);
        assert!(parse_certificates("").unwrap().is_empty());
    }
}
