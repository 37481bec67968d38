//! Snapshots - compact, comparable projections of a source result store

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::sources::SourceResultStore;

/// Point-in-time state of a target, reduced to the fields worth tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub social_presence: SocialPresence,
    pub domain_status: DomainStatus,
    pub email_status: EmailStatus,
    pub network_status: NetworkStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocialPresence {
    pub platforms: BTreeSet<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub domain: Option<String>,
    pub ip: Option<String>,
    pub ssl_valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatus {
    pub email: Option<String>,
    pub valid: bool,
    pub in_breach: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub open_port_count: usize,
    pub services: Vec<String>,
}

impl Snapshot {
    /// Hash of everything except the timestamp. Equal fingerprints always
    /// diff to an empty change set.
    pub fn fingerprint(&self) -> String {
        let comparable = (
            &self.social_presence,
            &self.domain_status,
            &self.email_status,
            &self.network_status,
        );
        let canonical = serde_json::to_string(&comparable).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }
}

/// Reduce a store to a snapshot. Missing sources give empty sections.
pub fn build_snapshot(store: &SourceResultStore) -> Snapshot {
    let social_presence = store
        .social()
        .map(|social| {
            let platforms: BTreeSet<String> = social.platforms_found.iter().cloned().collect();
            SocialPresence {
                count: platforms.len(),
                platforms,
            }
        })
        .unwrap_or_default();

    let domain_status = store
        .osint()
        .map(|osint| DomainStatus {
            domain: osint.target.clone(),
            ip: osint.ip_address().map(str::to_string),
            ssl_valid: osint.has_ssl_info,
        })
        .unwrap_or_default();

    let email_status = store
        .email()
        .map(|email| EmailStatus {
            email: email.email.clone(),
            valid: email.is_valid(),
            in_breach: email.in_breach(),
        })
        .unwrap_or_default();

    let network_status = store
        .network()
        .map(|network| NetworkStatus {
            open_port_count: network.open_ports().len(),
            services: network
                .open_ports()
                .iter()
                .map(|p| p.service.clone())
                .collect(),
        })
        .unwrap_or_default();

    Snapshot {
        timestamp: store.collected_at(),
        social_presence,
        domain_status,
        email_status,
        network_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;
    use serde_json::json;

    fn snapshot_of(sources: serde_json::Value) -> Snapshot {
        let store = SourceResultStore::from_json(&sources, Utc::now()).unwrap();
        build_snapshot(&store)
    }

    #[test]
    fn test_empty_store_snapshot() {
        let snap = snapshot_of(json!({}));
        assert!(snap.social_presence.platforms.is_empty());
        assert_eq!(snap.social_presence.count, 0);
        assert_eq!(snap.domain_status, DomainStatus::default());
        assert_eq!(snap.network_status.open_port_count, 0);
    }

    #[test]
    fn test_snapshot_fields() {
        let snap = snapshot_of(json!({
            "social": {"platformsFound": ["twitter", "github", "twitter"]},
            "osint": {"target": "acme.org", "ipInfo": {"ipAddress": "1.2.3.4"}, "sslInfo": {}},
            "email": {"email": "a@acme.org", "valid": {"valid": true}, "breachCheck": {"found": null}},
            "network": {"ports": {"openPorts": [{"port": 22, "service": "ssh"}, {"port": 80, "service": "http"}]}}
        }));

        assert_eq!(snap.social_presence.count, 2);
        assert!(snap.social_presence.platforms.contains("github"));
        assert_eq!(snap.domain_status.ip.as_deref(), Some("1.2.3.4"));
        assert!(snap.domain_status.ssl_valid);
        assert!(snap.email_status.valid);
        assert!(!snap.email_status.in_breach);
        assert_eq!(snap.network_status.services, vec!["ssh", "http"]);
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let store = SourceResultStore::new(Utc::now())
            .with_source(SourceKind::Social, json!({"platformsFound": ["github"]}))
            .unwrap();
        assert_eq!(build_snapshot(&store), build_snapshot(&store));
    }

    #[test]
    fn test_fingerprint_ignores_timestamp() {
        let a = snapshot_of(json!({"osint": {"target": "acme.org"}}));
        let mut b = a.clone();
        b.timestamp = a.timestamp + chrono::Duration::hours(1);
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.domain_status.ip = Some("5.6.7.8".to_string());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
