//! Tracking profiles - a baseline per target plus the history of what changed
//!
//! Observing never moves the baseline. Every comparison is made against the
//! baseline chosen at creation or by the last explicit `rebaseline`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alerts::{default_alert_rules, triggered_rules, AlertRule};
use crate::config::MonitoringConfig;
use crate::diff::{diff, ChangeSet, Severity};
use crate::snapshot::{build_snapshot, Snapshot};
use crate::sources::SourceResultStore;

/// What to recheck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorTarget {
    SocialProfile {
        platform: String,
        url: Option<String>,
    },
    Domain {
        target: String,
    },
    Email {
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPoint {
    #[serde(flatten)]
    pub target: MonitorTarget,
    pub check_interval_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingProfile {
    pub target_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    baseline: Snapshot,
    pub monitoring_points: Vec<MonitoringPoint>,
    pub alert_rules: Vec<AlertRule>,
    history: Vec<ChangeSet>,
}

/// Summary of a tracking profile's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub target_id: String,
    pub generated_at: DateTime<Utc>,
    pub observations: usize,
    pub total_changes: usize,
    pub highest_severity: Severity,
    pub severity_counts: BTreeMap<Severity, usize>,
    pub triggered_rules: Vec<String>,
}

impl TrackingProfile {
    pub fn create(target_id: impl Into<String>, store: &SourceResultStore) -> Self {
        Self::create_with(target_id, store, &MonitoringConfig::default())
    }

    pub fn create_with(
        target_id: impl Into<String>,
        store: &SourceResultStore,
        monitoring: &MonitoringConfig,
    ) -> Self {
        let target_id = target_id.into();
        let monitoring_points = identify_monitoring_points(store, monitoring);
        info!(
            target_id = %target_id,
            points = monitoring_points.len(),
            "created tracking profile"
        );

        Self {
            target_id,
            created_at: store.collected_at(),
            last_updated: store.collected_at(),
            baseline: build_snapshot(store),
            monitoring_points,
            alert_rules: default_alert_rules(),
            history: Vec::new(),
        }
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn history(&self) -> &[ChangeSet] {
        &self.history
    }

    /// Diff a snapshot against the baseline without recording it
    pub fn compare(&self, current: &Snapshot) -> ChangeSet {
        diff(&self.baseline, current)
    }

    /// Append a change set to the history
    pub fn record(&mut self, change_set: ChangeSet) {
        self.last_updated = self.last_updated.max(change_set.timestamp);
        debug!(
            target_id = %self.target_id,
            changes = change_set.change_count,
            severity = change_set.severity.as_str(),
            "recorded change set"
        );
        self.history.push(change_set);
    }

    /// Snapshot a new store, diff it against the baseline and record the result
    pub fn observe(&mut self, store: &SourceResultStore) -> &ChangeSet {
        let current = build_snapshot(store);
        let change_set = if current.fingerprint() == self.baseline.fingerprint() {
            debug!(target_id = %self.target_id, "observation matches baseline");
            ChangeSet::new(current.timestamp, Vec::new())
        } else {
            self.compare(&current)
        };
        self.record(change_set);
        &self.history[self.history.len() - 1]
    }

    /// Replace the baseline. History is kept as is.
    pub fn rebaseline(&mut self, snapshot: Snapshot) {
        info!(target_id = %self.target_id, "baseline replaced");
        self.last_updated = self.last_updated.max(snapshot.timestamp);
        self.baseline = snapshot;
    }

    pub fn report(&self, generated_at: DateTime<Utc>) -> TrackingReport {
        let mut severity_counts = BTreeMap::new();
        for change in self.history.iter().flat_map(|cs| &cs.changes) {
            *severity_counts.entry(change.severity).or_insert(0) += 1;
        }

        let rules_hit = self
            .alert_rules
            .iter()
            .filter(|rule| {
                self.history
                    .iter()
                    .any(|cs| triggered_rules(cs, &self.alert_rules).contains(rule))
            })
            .map(|rule| rule.id.clone())
            .collect();

        TrackingReport {
            target_id: self.target_id.clone(),
            generated_at,
            observations: self.history.len(),
            total_changes: self.history.iter().map(|cs| cs.change_count).sum(),
            highest_severity: self
                .history
                .iter()
                .map(|cs| cs.severity)
                .max()
                .unwrap_or(Severity::None),
            severity_counts,
            triggered_rules: rules_hit,
        }
    }
}

/// Derive recheck points: one per social platform, one for the domain and
/// one for the email
pub fn identify_monitoring_points(
    store: &SourceResultStore,
    monitoring: &MonitoringConfig,
) -> Vec<MonitoringPoint> {
    let mut points = Vec::new();

    if let Some(social) = store.social() {
        let mut seen = BTreeSet::new();
        for platform in &social.platforms_found {
            if !seen.insert(platform.as_str()) {
                continue;
            }
            points.push(MonitoringPoint {
                target: MonitorTarget::SocialProfile {
                    platform: platform.clone(),
                    url: social.profile(platform).and_then(|p| p.url.clone()),
                },
                check_interval_seconds: monitoring.social_interval_secs,
            });
        }
    }

    if let Some(domain) = store.osint().and_then(|o| o.target.clone()) {
        points.push(MonitoringPoint {
            target: MonitorTarget::Domain { target: domain },
            check_interval_seconds: monitoring.domain_interval_secs,
        });
    }

    if let Some(email) = store.email().and_then(|e| e.email.clone()) {
        points.push(MonitoringPoint {
            target: MonitorTarget::Email { target: email },
            check_interval_seconds: monitoring.email_interval_secs,
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{DOMAIN_CHANGE, NEW_SOCIAL_ACCOUNT};
    use crate::sources::SourceKind;
    use chrono::Duration;
    use serde_json::{json, Value};

    fn store_at(at: DateTime<Utc>, sources: Value) -> SourceResultStore {
        SourceResultStore::from_json(&sources, at).unwrap()
    }

    fn initial(at: DateTime<Utc>) -> SourceResultStore {
        store_at(
            at,
            json!({
                "social": {
                    "platformsFound": ["github", "twitter"],
                    "profiles": {"github": {"url": "https://github.com/jdoe"}}
                },
                "osint": {"target": "acme.org", "ipInfo": {"ipAddress": "1.2.3.4"}},
                "email": {"email": "jdoe@acme.org", "breachCheck": {"found": false}}
            }),
        )
    }

    #[test]
    fn test_monitoring_points() {
        let profile = TrackingProfile::create("jdoe", &initial(Utc::now()));
        let points = &profile.monitoring_points;
        assert_eq!(points.len(), 4);

        assert_eq!(
            points[0],
            MonitoringPoint {
                target: MonitorTarget::SocialProfile {
                    platform: "github".to_string(),
                    url: Some("https://github.com/jdoe".to_string()),
                },
                check_interval_seconds: 3600,
            }
        );
        assert_eq!(points[2].check_interval_seconds, 86_400);
        assert_eq!(points[3].check_interval_seconds, 604_800);
    }

    #[test]
    fn test_duplicate_platforms_give_one_point_each() {
        let s = store_at(
            Utc::now(),
            json!({"social": {"platformsFound": ["github", "twitter", "github"]}}),
        );
        let points = identify_monitoring_points(&s, &MonitoringConfig::default());
        let platforms: Vec<_> = points
            .iter()
            .filter_map(|p| match &p.target {
                MonitorTarget::SocialProfile { platform, .. } => Some(platform.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(platforms, vec!["github", "twitter"]);
        assert_eq!(build_snapshot(&s).social_presence.count, platforms.len());
    }

    #[test]
    fn test_unchanged_observation_records_empty_set() {
        let t0 = Utc::now();
        let mut profile = TrackingProfile::create("jdoe", &initial(t0));
        let later = t0 + Duration::hours(6);

        let change_set = profile.observe(&initial(later));
        assert!(change_set.is_empty());
        assert_eq!(change_set.severity, Severity::None);
        assert_eq!(change_set.timestamp, later);
        assert_eq!(profile.history().len(), 1);
        assert_eq!(profile.last_updated, later);
    }

    #[test]
    fn test_configured_intervals() {
        let monitoring = MonitoringConfig {
            social_interval_secs: 60,
            ..MonitoringConfig::default()
        };
        let profile = TrackingProfile::create_with("jdoe", &initial(Utc::now()), &monitoring);
        assert_eq!(profile.monitoring_points[0].check_interval_seconds, 60);
    }

    #[test]
    fn test_observe_appends_and_keeps_baseline() {
        let t0 = Utc::now();
        let mut profile = TrackingProfile::create("jdoe", &initial(t0));
        let baseline = profile.baseline().clone();

        let changed = store_at(
            t0 + Duration::hours(1),
            json!({
                "social": {"platformsFound": ["github", "twitter", "mastodon"]},
                "osint": {"target": "acme.org", "ipInfo": {"ipAddress": "5.6.7.8"}},
                "email": {"email": "jdoe@acme.org", "breachCheck": {"found": false}}
            }),
        );

        let severity = profile.observe(&changed).severity;
        assert_eq!(severity, Severity::High);
        assert_eq!(profile.history().len(), 1);
        assert_eq!(profile.baseline(), &baseline);

        // same observation again still compares to the original baseline
        profile.observe(&changed);
        assert_eq!(profile.history().len(), 2);
        assert_eq!(profile.history()[1].change_count, 2);
        assert_eq!(profile.last_updated, t0 + Duration::hours(1));
    }

    #[test]
    fn test_rebaseline() {
        let t0 = Utc::now();
        let mut profile = TrackingProfile::create("jdoe", &initial(t0));
        let moved = store_at(
            t0 + Duration::days(1),
            json!({"osint": {"target": "acme.org", "ipInfo": {"ipAddress": "5.6.7.8"}}}),
        );

        profile.rebaseline(build_snapshot(&moved));
        let changes = profile.observe(&moved);
        assert!(changes.is_empty());
        assert!(profile.history().len() == 1);
    }

    #[test]
    fn test_report() {
        let t0 = Utc::now();
        let mut profile = TrackingProfile::create("jdoe", &initial(t0));
        let mut next = initial(t0 + Duration::hours(2));
        next.insert(
            SourceKind::Social,
            json!({"platformsFound": ["github", "twitter", "gitlab"]}),
        )
        .unwrap();
        profile.observe(&next);
        profile.observe(&initial(t0 + Duration::hours(3)));

        let report = profile.report(t0 + Duration::hours(4));
        assert_eq!(report.observations, 2);
        assert_eq!(report.total_changes, 1);
        assert_eq!(report.highest_severity, Severity::Medium);
        assert_eq!(report.severity_counts.get(&Severity::Medium), Some(&1));
        assert_eq!(report.triggered_rules, vec![NEW_SOCIAL_ACCOUNT]);
        assert!(!report.triggered_rules.contains(&DOMAIN_CHANGE.to_string()));
    }

    #[test]
    fn test_empty_store_has_no_points() {
        let profile = TrackingProfile::create("nobody", &store_at(Utc::now(), json!({})));
        assert!(profile.monitoring_points.is_empty());
        assert_eq!(profile.alert_rules.len(), 5);
        assert!(profile.history().is_empty());
    }
}
