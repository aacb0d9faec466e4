//! Bookkeeping record for one issued instance certificate.
//!
//! Records are keyed by `(provider, instance_id)`. The platform also looks
//! them up by `(provider/service, current_serial)`, so both live on the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted state for the certificate currently held by one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509CertRecord {
    /// Issuing provider scoping the instance id
    pub provider: String,

    /// Instance identifier within the provider
    pub instance_id: String,

    /// Service the instance runs as
    pub service: String,

    /// Serial number of the certificate now in use
    pub current_serial: String,

    /// When the current certificate was issued
    pub current_time: DateTime<Utc>,

    /// Address the current certificate was requested from
    pub current_ip: String,

    /// Serial number of the certificate the current one replaced
    pub prev_serial: String,

    /// When the previous certificate was issued
    pub prev_time: DateTime<Utc>,

    /// Address the previous certificate was requested from
    pub prev_ip: String,

    /// Client-only certificate (no server usage)
    pub client_cert: bool,

    pub expiry_time: Option<DateTime<Utc>>,

    pub hostname: Option<String>,
}

impl X509CertRecord {
    /// Start a record for a freshly registered instance.
    ///
    /// The previous-certificate fields mirror the current ones until the first
    /// renewal, so a replayed first certificate still matches `prev_serial`.
    pub fn new(
        provider: impl Into<String>,
        instance_id: impl Into<String>,
        service: impl Into<String>,
        serial: impl Into<String>,
        ip: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let serial = serial.into();
        let ip = ip.into();
        Self {
            provider: provider.into(),
            instance_id: instance_id.into(),
            service: service.into(),
            current_serial: serial.clone(),
            current_time: issued_at,
            current_ip: ip.clone(),
            prev_serial: serial,
            prev_time: issued_at,
            prev_ip: ip,
            ..Default::default()
        }
    }

    /// Record a renewal: the current certificate becomes the previous one.
    pub fn rotate(&mut self, serial: impl Into<String>, ip: impl Into<String>, now: DateTime<Utc>) {
        self.prev_serial = std::mem::replace(&mut self.current_serial, serial.into());
        self.prev_ip = std::mem::replace(&mut self.current_ip, ip.into());
        self.prev_time = std::mem::replace(&mut self.current_time, now);
    }

    /// Check whether a presented serial belongs to this instance's current or
    /// immediately previous certificate.
    pub fn matches_serial(&self, serial: &str) -> bool {
        self.current_serial == serial || self.prev_serial == serial
    }

    /// Check if the recorded certificate has expired.
    pub fn is_expired(&self) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry <= Utc::now())
    }
}
