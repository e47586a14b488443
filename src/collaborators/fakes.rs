//! In-memory stand-ins for the four external capability contracts, used by
//! the reconciler, renewal, and route manager tests. Each fake appends to a
//! shared [`CallLog`] so tests can assert on call order directly (invariant
//! I7: IAM upload precedes CDN bind precedes IAM rename) instead of
//! reverse-engineering it from side effects.

use super::{CertResource, Distribution, DistributionIface, IamIface, PemParser};
use crate::error::{Result, RouteError};
use async_trait::async_trait;
use jiff::Timestamp;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records calls across every fake sharing the same handle, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn push(&self, entry: impl Into<String>) {
        self.0.lock().await.push(entry.into());
    }

    /// A snapshot of everything recorded so far, in call order.
    pub async fn entries(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }
}

/// A fake CDN control plane. `create` hands out sequential distribution ids;
/// `delete` consumes a scripted per-distribution result queue so tests can
/// model the "disable takes a tick to propagate" scenario explicitly.
#[derive(Debug, Clone)]
pub struct FakeCdn {
    log: CallLog,
    distributions: Arc<Mutex<HashMap<String, Distribution>>>,
    delete_results: Arc<Mutex<HashMap<String, VecDeque<bool>>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeCdn {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            distributions: Arc::new(Mutex::new(HashMap::new())),
            delete_results: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Scripts the `Ok(bool)` sequence `delete` returns for `dist_id`, one
    /// value consumed per call. Without scripting, `delete` always succeeds.
    pub async fn script_delete(&self, dist_id: impl Into<String>, results: impl IntoIterator<Item = bool>) {
        self.delete_results
            .lock()
            .await
            .insert(dist_id.into(), results.into_iter().collect());
    }

    pub async fn distribution(&self, dist_id: &str) -> Option<Distribution> {
        self.distributions.lock().await.get(dist_id).cloned()
    }
}

#[async_trait]
impl DistributionIface for FakeCdn {
    async fn create(
        &self,
        _domains: &[String],
        _origin: &str,
        _path: &str,
        _insecure_origin: bool,
        _forwarded_headers: &[String],
        _tags: &HashMap<String, String>,
    ) -> Result<Distribution> {
        self.log.push("cdn.create").await;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let dist = Distribution {
            dist_id: format!("dist-{n}"),
            domain_name: format!("d{n}.cdn.test"),
            status: "Deployed".to_string(),
            enabled: true,
        };
        self.distributions
            .lock()
            .await
            .insert(dist.dist_id.clone(), dist.clone());
        Ok(dist)
    }

    async fn update(
        &self,
        dist_id: &str,
        _domains: &[String],
        _origin: &str,
        _path: &str,
    ) -> Result<Distribution> {
        self.log.push("cdn.update").await;
        self.get(dist_id).await
    }

    async fn get(&self, dist_id: &str) -> Result<Distribution> {
        self.log.push("cdn.get").await;
        self.distributions
            .lock()
            .await
            .get(dist_id)
            .cloned()
            .ok_or_else(|| RouteError::transient("cdn", format!("no such distribution: {dist_id}")))
    }

    async fn set_certificate(&self, dist_id: &str, cert_id: &str) -> Result<()> {
        self.log
            .push(format!("cdn.set_certificate:{dist_id}:{cert_id}"))
            .await;
        self.distributions
            .lock()
            .await
            .get(dist_id)
            .map(|_| ())
            .ok_or_else(|| RouteError::transient("cdn", format!("no such distribution: {dist_id}")))
    }

    async fn disable(&self, dist_id: &str) -> Result<()> {
        self.log.push(format!("cdn.disable:{dist_id}")).await;
        let mut distributions = self.distributions.lock().await;
        let dist = distributions
            .get_mut(dist_id)
            .ok_or_else(|| RouteError::transient("cdn", format!("no such distribution: {dist_id}")))?;
        dist.enabled = false;
        Ok(())
    }

    async fn delete(&self, dist_id: &str) -> Result<bool> {
        self.log.push(format!("cdn.delete:{dist_id}")).await;
        let mut scripted = self.delete_results.lock().await;
        let ready = match scripted.get_mut(dist_id).and_then(VecDeque::pop_front) {
            Some(result) => result,
            None => true,
        };
        if ready {
            self.distributions.lock().await.remove(dist_id);
        }
        Ok(ready)
    }
}

/// A fake IAM certificate store. Aliases map to opaque cert ids; rename is
/// idempotent so a crash between rename and the caller observing it doesn't
/// turn into a test failure, mirroring the real service's contract.
#[derive(Debug, Clone)]
pub struct FakeIam {
    log: CallLog,
    certs_by_alias: Arc<Mutex<HashMap<String, String>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeIam {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            certs_by_alias: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn cert_id_for(&self, alias: &str) -> Option<String> {
        self.certs_by_alias.lock().await.get(alias).cloned()
    }
}

#[async_trait]
impl IamIface for FakeIam {
    async fn upload_certificate(&self, alias: &str, _cert_pem: &str) -> Result<String> {
        self.log.push(format!("iam.upload:{alias}")).await;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let cert_id = format!("cert-{n}");
        self.certs_by_alias
            .lock()
            .await
            .insert(alias.to_string(), cert_id.clone());
        Ok(cert_id)
    }

    async fn rename_certificate(&self, old_alias: &str, new_alias: &str) -> Result<()> {
        self.log
            .push(format!("iam.rename:{old_alias}->{new_alias}"))
            .await;
        let mut certs = self.certs_by_alias.lock().await;
        if let Some(cert_id) = certs.remove(old_alias) {
            certs.insert(new_alias.to_string(), cert_id);
            Ok(())
        } else if certs.contains_key(new_alias) {
            // Already renamed by a previous, interrupted attempt.
            Ok(())
        } else {
            Err(RouteError::transient(
                "iam",
                format!("no certificate aliased {old_alias}"),
            ))
        }
    }

    async fn delete_certificate(&self, alias: &str, _force: bool) -> Result<()> {
        self.log.push(format!("iam.delete:{alias}")).await;
        self.certs_by_alias.lock().await.remove(alias);
        Ok(())
    }
}

/// A fake ACME client. Issued certificates carry a synthetic PEM body
/// understood only by [`FakePemParser`] — a real ASN.1 fixture isn't needed
/// to exercise expiry-driven renewal logic.
#[derive(Debug, Clone)]
pub struct FakeAcme {
    log: CallLog,
    default_lifetime_secs: i64,
    next_serial: Arc<AtomicU64>,
    fail_domains: Arc<Mutex<Vec<String>>>,
}

impl FakeAcme {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            default_lifetime_secs: 90 * 24 * 3600,
            next_serial: Arc::new(AtomicU64::new(1)),
            fail_domains: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_lifetime(mut self, secs: i64) -> Self {
        self.default_lifetime_secs = secs;
        self
    }

    /// Makes `obtain_certificate`/`renew_certificate` fail whenever `domain`
    /// is the first entry of the SAN list, to model a CA outage for one
    /// tenant without affecting the rest of a sweep.
    pub async fn fail_for(&self, domain: impl Into<String>) {
        self.fail_domains.lock().await.push(domain.into());
    }

    fn fixture_pem(serial: u64, not_after: Timestamp) -> String {
        format!(
            "-----BEGIN FAKE CERTIFICATE-----\nX-Serial: {serial}\nX-Expires: {}\n-----END FAKE CERTIFICATE-----\n",
            not_after.as_second()
        )
    }
}

#[async_trait]
impl super::AcmeIface for FakeAcme {
    async fn obtain_certificate(&self, domains: &[String]) -> Result<CertResource> {
        self.log.push("acme.obtain").await;
        let primary = domains.first().cloned().unwrap_or_default();
        if self.fail_domains.lock().await.contains(&primary) {
            return Err(RouteError::transient("acme", format!("CA unavailable for {primary}")));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let not_after = Timestamp::now().saturating_add(jiff::Span::new().seconds(self.default_lifetime_secs));
        Ok(CertResource {
            domain: primary.clone(),
            cert_url: format!("https://ca.test/cert/{serial}"),
            certificate_pem: Self::fixture_pem(serial, not_after),
        })
    }

    async fn renew_certificate(&self, resource: &CertResource) -> Result<CertResource> {
        self.log.push("acme.renew").await;
        if self.fail_domains.lock().await.contains(&resource.domain) {
            return Err(RouteError::transient(
                "acme",
                format!("CA unavailable for {}", resource.domain),
            ));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let not_after = Timestamp::now().saturating_add(jiff::Span::new().seconds(self.default_lifetime_secs));
        Ok(CertResource {
            domain: resource.domain.clone(),
            cert_url: resource.cert_url.clone(),
            certificate_pem: Self::fixture_pem(serial, not_after),
        })
    }
}

/// Reads the `X-Expires` line out of [`FakeAcme`]'s synthetic PEM bodies.
/// Real certificates, issued in production, are read with
/// [`super::X509PemParser`] instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakePemParser;

impl PemParser for FakePemParser {
    fn expiration_of(&self, pem_bytes: &[u8]) -> Result<Timestamp> {
        let text = std::str::from_utf8(pem_bytes)
            .map_err(|e| RouteError::malformed_certificate(e.to_string()))?;
        let line = text
            .lines()
            .find_map(|line| line.strip_prefix("X-Expires: "))
            .ok_or_else(|| RouteError::malformed_certificate("missing X-Expires fixture line"))?;
        let secs: i64 = line
            .trim()
            .parse()
            .map_err(|_| RouteError::malformed_certificate("non-numeric X-Expires"))?;
        Timestamp::from_second(secs)
            .map_err(|e| RouteError::malformed_certificate(format!("invalid expiry: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cdn_create_then_get_round_trips() {
        let log = CallLog::new();
        let cdn = FakeCdn::new(log.clone());
        let dist = cdn
            .create(&["a.example.com".into()], "origin.app", "/", false, &[], &HashMap::new())
            .await
            .unwrap();
        let fetched = cdn.get(&dist.dist_id).await.unwrap();
        assert_eq!(fetched.dist_id, dist.dist_id);
        assert_eq!(log.entries().await, vec!["cdn.create", "cdn.get"]);
    }

    #[tokio::test]
    async fn cdn_delete_respects_scripted_sequence() {
        let log = CallLog::new();
        let cdn = FakeCdn::new(log);
        let dist = cdn
            .create(&["a.example.com".into()], "origin.app", "/", false, &[], &HashMap::new())
            .await
            .unwrap();
        cdn.script_delete(&dist.dist_id, [false, true]).await;
        assert!(!cdn.delete(&dist.dist_id).await.unwrap());
        assert!(cdn.delete(&dist.dist_id).await.unwrap());
        assert!(cdn.distribution(&dist.dist_id).await.is_none());
    }

    #[tokio::test]
    async fn iam_rename_is_idempotent() {
        let log = CallLog::new();
        let iam = FakeIam::new(log);
        let cert_id = iam.upload_certificate("alias-new", "pem").await.unwrap();
        iam.rename_certificate("alias-new", "alias").await.unwrap();
        // A second, "already happened" rename must not error.
        iam.rename_certificate("alias-new", "alias").await.unwrap();
        assert_eq!(iam.cert_id_for("alias").await, Some(cert_id));
    }

    #[tokio::test]
    async fn acme_failure_is_scoped_to_one_domain() {
        let log = CallLog::new();
        let acme = FakeAcme::new(log);
        acme.fail_for("bad.example.com").await;
        assert!(super::super::AcmeIface::obtain_certificate(&acme, &["bad.example.com".into()])
            .await
            .is_err());
        assert!(super::super::AcmeIface::obtain_certificate(&acme, &["good.example.com".into()])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn fake_pem_parser_round_trips_fixture() {
        let acme = FakeAcme::new(CallLog::new());
        let resource = super::super::AcmeIface::obtain_certificate(&acme, &["a.example.com".into()])
            .await
            .unwrap();
        let expires = FakePemParser.expiration_of(resource.certificate_pem.as_bytes()).unwrap();
        assert!(expires > Timestamp::now());
    }
}
