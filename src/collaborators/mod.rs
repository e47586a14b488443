//! External capability contracts (§6): the CDN control plane, the IAM /
//! certificate store, and the ACME client. The core depends only on these
//! traits, never on a concrete SDK, the same way this lineage keeps its own
//! DNS-provider and challenge-solver contracts abstract.

pub mod fakes;

use crate::error::{Result, RouteError};
use async_trait::async_trait;
use jiff::Timestamp;
use std::collections::HashMap;
use x509_parser::prelude::{FromDer, X509Certificate};

/// A CDN edge distribution as observed through [`DistributionIface`].
#[derive(Debug, Clone)]
pub struct Distribution {
    pub dist_id: String,
    /// Distribution hostname assigned by the CDN (becomes `domain_internal`).
    pub domain_name: String,
    /// e.g. `"Deployed"`, `"InProgress"`.
    pub status: String,
    pub enabled: bool,
}

/// The CDN control plane (§6). Creates, mutates, and tears down edge
/// distributions.
#[async_trait]
pub trait DistributionIface: Send + Sync {
    /// Creates a new edge distribution with two origins: the tenant origin
    /// and an S3 bucket reserved for ACME HTTP-01 challenges at path
    /// `/.well-known/acme-challenge/*`.
    async fn create(
        &self,
        domains: &[String],
        origin: &str,
        path: &str,
        insecure_origin: bool,
        forwarded_headers: &[String],
        tags: &HashMap<String, String>,
    ) -> Result<Distribution>;

    /// Mutates domains/origins in place, preserving `dist_id`.
    async fn update(
        &self,
        dist_id: &str,
        domains: &[String],
        origin: &str,
        path: &str,
    ) -> Result<Distribution>;

    /// Current observable state of a distribution.
    async fn get(&self, dist_id: &str) -> Result<Distribution>;

    /// Binds the distribution's viewer certificate to an IAM cert, per the
    /// certificate deployment protocol's bind step.
    async fn set_certificate(&self, dist_id: &str, cert_id: &str) -> Result<()>;

    /// Sets `enabled = false`. Takes real time to propagate; observable via
    /// a subsequent `get`.
    async fn disable(&self, dist_id: &str) -> Result<()>;

    /// Returns `true` only when the distribution's status is `"Deployed"`
    /// (i.e. disabling has propagated) and the deletion was accepted. Never
    /// blocks waiting for propagation — a `false` result means "try again
    /// later", not an error.
    async fn delete(&self, dist_id: &str) -> Result<bool>;
}

/// The IAM / certificate store (§6).
#[async_trait]
pub trait IamIface: Send + Sync {
    /// Uploads a PEM certificate under `alias`, returning the assigned
    /// `cert_id`.
    async fn upload_certificate(&self, alias: &str, cert_pem: &str) -> Result<String>;

    /// Renames `old_alias` to `new_alias`. Must tolerate `old_alias` already
    /// having been renamed by a previous, interrupted attempt.
    async fn rename_certificate(&self, old_alias: &str, new_alias: &str) -> Result<()>;

    /// Removes the certificate aliased `alias`.
    async fn delete_certificate(&self, alias: &str, force: bool) -> Result<()>;
}

/// An ACME certificate resource: what's needed to identify it for renewal.
#[derive(Debug, Clone)]
pub struct CertResource {
    pub domain: String,
    /// CA-assigned resource URL, required for renewal.
    pub cert_url: String,
    pub certificate_pem: String,
}

/// The ACME client (§6). HTTP-01 challenges are served from the
/// distribution's S3 origin; that plumbing lives entirely behind this trait.
#[async_trait]
pub trait AcmeIface: Send + Sync {
    /// Obtains a certificate covering the full SAN list.
    async fn obtain_certificate(&self, domains: &[String]) -> Result<CertResource>;

    /// Renews from an existing resource's `cert_url` + PEM.
    async fn renew_certificate(&self, resource: &CertResource) -> Result<CertResource>;
}

/// The fourth capability contract from §6: reading the not-after time out of
/// a PEM-encoded certificate chain. Pulled out as its own trait, rather than
/// a bare function, so tests can swap in certificate fixtures that don't
/// require hand-assembled ASN.1 to exercise the reconciler and renewal paths.
pub trait PemParser: Send + Sync {
    fn expiration_of(&self, pem_bytes: &[u8]) -> Result<Timestamp>;
}

/// Parses the not-after time of the leaf certificate out of a PEM-encoded
/// chain, the way this lineage already reads certificate validity windows
/// with `x509-parser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct X509PemParser;

impl PemParser for X509PemParser {
    fn expiration_of(&self, pem_bytes: &[u8]) -> Result<Timestamp> {
        let parsed =
            pem::parse(pem_bytes).map_err(|e| RouteError::malformed_certificate(e.to_string()))?;

        let (_, cert) = X509Certificate::from_der(parsed.contents())
            .map_err(|e| RouteError::malformed_certificate(e.to_string()))?;

        let not_after = cert.validity().not_after.timestamp();
        Timestamp::from_second(not_after)
            .map_err(|e| RouteError::malformed_certificate(format!("invalid expiry: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_of_rejects_garbage() {
        let err = X509PemParser.expiration_of(b"not a pem").unwrap_err();
        assert!(matches!(err, RouteError::MalformedCertificate(_)));
    }
}
