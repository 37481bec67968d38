//! Alert rule registry
//!
//! The catalog is static. Matching a change set against it is exposed as a
//! pure function; deciding whether and where to notify is up to whatever
//! scheduler consumes these values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{Change, ChangeKind, ChangeSet, Severity};

pub const NEW_SOCIAL_ACCOUNT: &str = "new_social_account";
pub const DOMAIN_CHANGE: &str = "domain_change";
pub const NEW_BREACH: &str = "new_breach";
pub const NETWORK_CHANGE: &str = "network_change";
pub const LOCATION_CHANGE: &str = "location_change";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub enabled: bool,
}

impl AlertRule {
    fn builtin(id: &str, description: &str, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            severity,
            enabled: true,
        }
    }
}

/// The five built-in rules, all enabled
pub fn default_alert_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::builtin(
            NEW_SOCIAL_ACCOUNT,
            "Alert when new social media account is detected",
            Severity::Medium,
        ),
        AlertRule::builtin(
            DOMAIN_CHANGE,
            "Alert when domain registration changes",
            Severity::High,
        ),
        AlertRule::builtin(
            NEW_BREACH,
            "Alert when email appears in new breach",
            Severity::High,
        ),
        AlertRule::builtin(
            NETWORK_CHANGE,
            "Alert when network configuration changes",
            Severity::Medium,
        ),
        AlertRule::builtin(
            LOCATION_CHANGE,
            "Alert when location data changes",
            Severity::Low,
        ),
    ]
}

/// Rule id a change type maps to. Removed social accounts map to nothing.
pub fn rule_for_change(kind: &ChangeKind) -> Option<&'static str> {
    match kind {
        ChangeKind::SocialAccountAdded { .. } => Some(NEW_SOCIAL_ACCOUNT),
        ChangeKind::SocialAccountRemoved { .. } => None,
        ChangeKind::IpChange { .. } => Some(DOMAIN_CHANGE),
        ChangeKind::NewBreachDetected { .. } => Some(NEW_BREACH),
        ChangeKind::NetworkConfigurationChange { .. } => Some(NETWORK_CHANGE),
    }
}

/// Enabled rules matched by at least one change, in catalog order
pub fn triggered_rules<'a>(change_set: &ChangeSet, rules: &'a [AlertRule]) -> Vec<&'a AlertRule> {
    rules
        .iter()
        .filter(|rule| rule.enabled)
        .filter(|rule| {
            change_set
                .changes
                .iter()
                .any(|c| rule_for_change(&c.kind) == Some(rule.id.as_str()))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Acknowledged,
}

/// A notification candidate produced from a triggered rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub alert_id: String,
    pub timestamp: DateTime<Utc>,
    pub rule_id: String,
    pub severity: Severity,
    pub change: Change,
    pub status: AlertStatus,
    pub acknowledged: bool,
}

impl Alert {
    pub fn from_rule(rule: &AlertRule, change: &Change, at: DateTime<Utc>) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            timestamp: at,
            rule_id: rule.id.clone(),
            severity: rule.severity,
            change: change.clone(),
            status: AlertStatus::New,
            acknowledged: false,
        }
    }

    pub fn acknowledge(&mut self) {
        self.status = AlertStatus::Acknowledged;
        self.acknowledged = true;
    }
}

/// One alert per change whose rule is present and enabled
pub fn build_alerts(change_set: &ChangeSet, rules: &[AlertRule]) -> Vec<Alert> {
    change_set
        .changes
        .iter()
        .filter_map(|change| {
            let rule_id = rule_for_change(&change.kind)?;
            let rule = rules.iter().find(|r| r.enabled && r.id == rule_id)?;
            Some(Alert::from_rule(rule, change, change_set.timestamp))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change_set(kinds: Vec<ChangeKind>) -> ChangeSet {
        ChangeSet::new(Utc::now(), kinds.into_iter().map(Change::new).collect())
    }

    #[test]
    fn test_default_catalog() {
        let rules = default_alert_rules();
        assert_eq!(rules.len(), 5);
        assert!(rules.iter().all(|r| r.enabled));
        let location = rules.iter().find(|r| r.id == LOCATION_CHANGE).unwrap();
        assert_eq!(location.severity, Severity::Low);
    }

    #[test]
    fn test_ip_change_triggers_domain_rule() {
        let rules = default_alert_rules();
        let changes = change_set(vec![ChangeKind::IpChange {
            old_ip: Some("1.2.3.4".to_string()),
            new_ip: Some("5.6.7.8".to_string()),
        }]);
        let triggered = triggered_rules(&changes, &rules);
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].id, DOMAIN_CHANGE);
    }

    #[test]
    fn test_disabled_rule_never_triggers() {
        let mut rules = default_alert_rules();
        rules.iter_mut().for_each(|r| r.enabled = r.id != NEW_BREACH);

        let changes = change_set(vec![ChangeKind::NewBreachDetected {
            email: Some("a@b.com".to_string()),
        }]);
        assert!(triggered_rules(&changes, &rules).is_empty());
        assert!(build_alerts(&changes, &rules).is_empty());
    }

    #[test]
    fn test_removed_account_triggers_nothing() {
        let changes = change_set(vec![ChangeKind::SocialAccountRemoved {
            platforms: vec!["twitter".to_string()],
        }]);
        assert!(triggered_rules(&changes, &default_alert_rules()).is_empty());
    }

    #[test]
    fn test_rules_reported_once_in_catalog_order() {
        let changes = change_set(vec![
            ChangeKind::NetworkConfigurationChange {
                old_ports: 1,
                new_ports: 2,
            },
            ChangeKind::SocialAccountAdded {
                platforms: vec!["github".to_string()],
            },
            ChangeKind::SocialAccountAdded {
                platforms: vec!["gitlab".to_string()],
            },
        ]);
        let rules = default_alert_rules();
        let ids: Vec<_> = triggered_rules(&changes, &rules)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec![NEW_SOCIAL_ACCOUNT, NETWORK_CHANGE]);
    }

    #[test]
    fn test_alert_lifecycle() {
        let changes = change_set(vec![ChangeKind::SocialAccountAdded {
            platforms: vec!["github".to_string()],
        }]);
        let mut alerts = build_alerts(&changes, &default_alert_rules());
        assert_eq!(alerts.len(), 1);

        let alert = &mut alerts[0];
        assert_eq!(alert.alert_id.len(), 8);
        assert_eq!(alert.status, AlertStatus::New);
        assert!(!alert.acknowledged);

        alert.acknowledge();
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert!(alert.acknowledged);
    }
}
