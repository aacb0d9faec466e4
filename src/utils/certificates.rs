//! Instance certificate parsing and instance-id resolution.
//!
//! Certificates issued through the instance registration path carry the
//! instance identifier in a Subject Alternative Name entry. Two encodings
//! are recognised:
//!
//! ```text
//! athenz://instanceid/{provider}/{instance_id}     (URI SAN)
//! {instance_id}.instanceid.athenz.{suffix}         (DNS SAN)
//! ```
//!
//! A certificate without either entry simply has no instance id.

use chrono::{DateTime, Utc};
use rustls::pki_types::{pem::PemObject, CertificateDer};
use x509_parser::prelude::*;

use crate::errors::{InstanceError, Result};

/// URI SAN prefix carrying `{provider}/{instance_id}`
pub const INSTANCE_ID_URI_PREFIX: &str = "athenz://instanceid/";

/// DNS SAN marker following the instance id label
pub const INSTANCE_ID_DNS_MARKER: &str = ".instanceid.athenz.";

/// An X.509 certificate with the metadata the record operations need.
#[derive(Debug, Clone)]
pub struct InstanceCertificate {
    subject: String,
    serial_number: String,
    not_after: DateTime<Utc>,
    dns_names: Vec<String>,
    uris: Vec<String>,
}

impl InstanceCertificate {
    /// Parse the first certificate in a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = CertificateDer::from_pem_slice(pem.as_bytes()).map_err(|err| {
            InstanceError::certificate_parse(format!("invalid certificate PEM: {err}"))
        })?;
        Self::from_der(der)
    }

    /// Parse a DER-encoded certificate.
    pub fn from_der(der: CertificateDer<'_>) -> Result<Self> {
        let (_, parsed) = X509Certificate::from_der(der.as_ref()).map_err(|err| {
            InstanceError::certificate_parse(format!("invalid X.509 certificate: {err}"))
        })?;

        let not_after = DateTime::from_timestamp(parsed.validity().not_after.timestamp(), 0)
            .ok_or_else(|| InstanceError::certificate_parse("certificate notAfter out of range"))?;

        let mut dns_names = Vec::new();
        let mut uris = Vec::new();
        for ext in parsed.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                        GeneralName::URI(uri) => uris.push(uri.to_string()),
                        _ => {}
                    }
                }
            }
        }

        let subject = parsed.subject().to_string();
        let serial_number = format!("{:x}", parsed.serial);

        Ok(Self { subject, serial_number, not_after, dns_names, uris })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Serial number as lowercase hex
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn uris(&self) -> &[String] {
        &self.uris
    }
}

/// Extract the instance id embedded in a certificate's SAN entries.
///
/// A URI entry wins over DNS entries. Returns `None` when the certificate was
/// not issued through the instance registration path.
///
/// Only the instance id is taken. The provider segment of a URI entry is not
/// compared with anything; records are looked up under the provider the
/// caller supplies.
pub fn resolve_instance_id(certificate: &InstanceCertificate) -> Option<String> {
    certificate
        .uris()
        .iter()
        .find_map(|uri| parse_instance_id_uri(uri).map(|(_, instance_id)| instance_id))
        .or_else(|| certificate.dns_names().iter().find_map(|dns| parse_instance_id_dns_name(dns)))
}

/// Parse `athenz://instanceid/{provider}/{instance_id}` into its parts.
pub fn parse_instance_id_uri(uri: &str) -> Option<(String, String)> {
    let rest = uri.strip_prefix(INSTANCE_ID_URI_PREFIX)?;
    let (provider, instance_id) = rest.split_once('/')?;
    if provider.is_empty() || instance_id.is_empty() || instance_id.contains('/') {
        return None;
    }
    Some((provider.to_string(), instance_id.to_string()))
}

/// Parse `{instance_id}.instanceid.athenz.{suffix}` into the instance id.
pub fn parse_instance_id_dns_name(dns_name: &str) -> Option<String> {
    match dns_name.find(INSTANCE_ID_DNS_MARKER) {
        Some(idx) if idx > 0 => Some(dns_name[..idx].to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair, SanType};

    fn issue(dns_names: &[&str], uris: &[&str]) -> String {
        let names: Vec<String> = dns_names.iter().map(|s| s.to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();
        params.distinguished_name.push(DnType::CommonName, "athenz.production");
        for uri in uris {
            params.subject_alt_names.push(SanType::URI((*uri).try_into().unwrap()));
        }
        let key_pair = KeyPair::generate().unwrap();
        params.self_signed(&key_pair).unwrap().pem()
    }

    #[test]
    fn test_parse_instance_id_uri() {
        assert_eq!(
            parse_instance_id_uri("athenz://instanceid/ostk/1001"),
            Some(("ostk".to_string(), "1001".to_string()))
        );
        assert!(parse_instance_id_uri("athenz://instanceid/ostk").is_none());
        assert!(parse_instance_id_uri("athenz://instanceid//1001").is_none());
        assert!(parse_instance_id_uri("athenz://instanceid/ostk/1001/extra").is_none());
        assert!(parse_instance_id_uri("spiffe://athenz/sa/api").is_none());
    }

    #[test]
    fn test_parse_instance_id_dns_name() {
        assert_eq!(parse_instance_id_dns_name("1001.instanceid.athenz.test"), Some("1001".into()));
        assert_eq!(
            parse_instance_id_dns_name("i-0abc.instanceid.athenz.cloud"),
            Some("i-0abc".into())
        );
        assert_eq!(
            parse_instance_id_dns_name("web.1001.instanceid.athenz.test"),
            Some("web.1001".into())
        );
        assert!(parse_instance_id_dns_name(".instanceid.athenz.test").is_none());
        assert!(parse_instance_id_dns_name("api.athenz.cloud").is_none());
    }

    #[test]
    fn test_resolve_from_dns_san() {
        let pem = issue(&["api.athenz.cloud", "1001.instanceid.athenz.test"], &[]);
        let cert = InstanceCertificate::from_pem(&pem).unwrap();

        assert_eq!(cert.dns_names().len(), 2);
        assert!(cert.subject().contains("athenz.production"));
        assert!(!cert.serial_number().is_empty());
        assert_eq!(resolve_instance_id(&cert), Some("1001".to_string()));
    }

    #[test]
    fn test_uri_san_wins_over_dns_san() {
        let pem = issue(&["2002.instanceid.athenz.test"], &["athenz://instanceid/ostk/1001"]);
        let cert = InstanceCertificate::from_pem(&pem).unwrap();
        assert_eq!(resolve_instance_id(&cert), Some("1001".to_string()));
    }

    #[test]
    fn test_uri_provider_segment_is_not_returned() {
        let pem = issue(&[], &["athenz://instanceid/aws/1001"]);
        let cert = InstanceCertificate::from_pem(&pem).unwrap();
        assert_eq!(resolve_instance_id(&cert), Some("1001".to_string()));
    }

    #[test]
    fn test_no_instance_id() {
        let pem = issue(&["api.athenz.cloud"], &["spiffe://athenz/sa/api"]);
        let cert = InstanceCertificate::from_pem(&pem).unwrap();
        assert!(resolve_instance_id(&cert).is_none());
    }

    #[test]
    fn test_malformed_pem_is_an_error() {
        let err = InstanceCertificate::from_pem("not a certificate").unwrap_err();
        assert!(matches!(err, InstanceError::CertificateParse { .. }));

        let err = InstanceCertificate::from_der(CertificateDer::from(vec![0x30, 0x01, 0x00]))
            .unwrap_err();
        assert!(matches!(err, InstanceError::CertificateParse { .. }));
    }
}
