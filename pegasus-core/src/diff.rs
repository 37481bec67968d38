//! Snapshot differencer
//!
//! Every rule is evaluated on its own; none of them short-circuits another.
//! Severities form a total order (none < low < medium < high) and a change
//! set's severity is the highest one among its changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What changed between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChangeKind {
    SocialAccountAdded {
        platforms: Vec<String>,
    },
    SocialAccountRemoved {
        platforms: Vec<String>,
    },
    IpChange {
        old_ip: Option<String>,
        new_ip: Option<String>,
    },
    NewBreachDetected {
        email: Option<String>,
    },
    NetworkConfigurationChange {
        old_ports: usize,
        new_ports: usize,
    },
}

impl ChangeKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::SocialAccountAdded { .. } => Severity::Medium,
            Self::SocialAccountRemoved { .. } => Severity::Low,
            Self::IpChange { .. } => Severity::High,
            Self::NewBreachDetected { .. } => Severity::High,
            Self::NetworkConfigurationChange { .. } => Severity::Medium,
        }
    }

    pub fn change_type(&self) -> &'static str {
        match self {
            Self::SocialAccountAdded { .. } => "social_account_added",
            Self::SocialAccountRemoved { .. } => "social_account_removed",
            Self::IpChange { .. } => "ip_change",
            Self::NewBreachDetected { .. } => "new_breach_detected",
            Self::NetworkConfigurationChange { .. } => "network_configuration_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            severity: kind.severity(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<Change>,
    pub change_count: usize,
    pub severity: Severity,
}

impl ChangeSet {
    pub fn new(timestamp: DateTime<Utc>, changes: Vec<Change>) -> Self {
        Self {
            timestamp,
            change_count: changes.len(),
            severity: aggregate_severity(&changes),
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Highest severity present, or `None` for no changes
pub fn aggregate_severity(changes: &[Change]) -> Severity {
    changes
        .iter()
        .map(|c| c.severity)
        .max()
        .unwrap_or(Severity::None)
}

/// Compare a current snapshot against a baseline
pub fn diff(baseline: &Snapshot, current: &Snapshot) -> ChangeSet {
    let mut changes = Vec::new();

    let old_platforms = &baseline.social_presence.platforms;
    let new_platforms = &current.social_presence.platforms;
    if old_platforms != new_platforms {
        let added: Vec<String> = new_platforms.difference(old_platforms).cloned().collect();
        let removed: Vec<String> = old_platforms.difference(new_platforms).cloned().collect();
        if !added.is_empty() {
            changes.push(Change::new(ChangeKind::SocialAccountAdded { platforms: added }));
        }
        if !removed.is_empty() {
            changes.push(Change::new(ChangeKind::SocialAccountRemoved {
                platforms: removed,
            }));
        }
    }

    if baseline.domain_status.ip != current.domain_status.ip {
        changes.push(Change::new(ChangeKind::IpChange {
            old_ip: baseline.domain_status.ip.clone(),
            new_ip: current.domain_status.ip.clone(),
        }));
    }

    // only false -> true is reported
    if !baseline.email_status.in_breach && current.email_status.in_breach {
        changes.push(Change::new(ChangeKind::NewBreachDetected {
            email: current.email_status.email.clone(),
        }));
    }

    let old_ports = baseline.network_status.open_port_count;
    let new_ports = current.network_status.open_port_count;
    if old_ports != new_ports {
        changes.push(Change::new(ChangeKind::NetworkConfigurationChange {
            old_ports,
            new_ports,
        }));
    }

    ChangeSet::new(current.timestamp, changes)
}
