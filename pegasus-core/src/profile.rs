//! Profile builder - merges every source into one intelligence profile
//!
//! Building never fails. A missing or error-flagged source simply leaves its
//! part of the profile empty, and every score stays within [0, 100].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ProfileConfig;
use crate::sources::{OpenPort, SourceKind, SourceResultStore};
use crate::{ERROR_MARKER, MAX_SCORE, UNKNOWN_PLACEHOLDER};

const BASE_CONFIDENCE: u32 = 50;
const MANY_SOURCES_BONUS: u32 = 20;
const VALID_EMAIL_BONUS: u32 = 15;
const VALID_PHONE_BONUS: u32 = 15;

const BREACH_RISK: i64 = 30;
const DISPOSABLE_RISK: i64 = 20;
const OPEN_PORTS_RISK: i64 = 25;
const OPEN_PORTS_THRESHOLD: usize = 10;

const REDACTED_EMAIL: &str = "***@***";
const REDACTED_PHONE: &str = "+***********";

/// Unified view of a target across all sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub timestamp: DateTime<Utc>,
    pub summary: ProfileSummary,
    pub identity: Identity,
    pub online_presence: OnlinePresence,
    pub contact_information: ContactInformation,
    pub technical_footprint: TechnicalFootprint,
    pub timeline: Vec<TimelineEvent>,
    pub relationships: Relationships,
    pub risk_assessment: RiskAssessment,
    pub confidence: u8,
    pub confidence_explanation: Vec<String>,
    pub data_quality: DataQuality,
    pub entity_resolution: EntityResolution,
    pub relation_matrix: RelationMatrix,
    pub data_sources: Vec<SourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub total_sources: usize,
    pub data_quality: DataQuality,
    pub confidence_score: u8,
    pub domain: Option<String>,
    pub platforms_found: Option<usize>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Identity attributes. Each list is deduplicated and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub names: Vec<String>,
    pub usernames: Vec<String>,
    pub aliases: Vec<String>,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub affiliations: Vec<Affiliation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    #[serde(rename = "type")]
    pub kind: AffiliationKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffiliationKind {
    Domain,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlinePresence {
    pub social_media: BTreeMap<String, PlatformPresence>,
    pub websites: Vec<String>,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPresence {
    pub url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    pub emails: Vec<EmailContact>,
    pub phone_numbers: Vec<PhoneContact>,
    pub social_handles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContact {
    pub email: Option<String>,
    pub valid: bool,
    pub disposable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneContact {
    pub number: Option<String>,
    pub valid: bool,
    pub carrier: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalFootprint {
    pub ip_addresses: Vec<String>,
    pub domains: Vec<String>,
    pub ports: Vec<OpenPort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub event: String,
    pub source: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
    pub connections: Vec<Connection>,
    pub associated_entities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Connection {
    SocialMedia { platforms: Vec<String> },
    DomainAssociation { entities: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: i64) -> Self {
        if score > 60 {
            Self::High
        } else if score > 30 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub score: f64,
    pub total_fields: usize,
    pub filled_fields: usize,
}

/// Canonical identifiers. Each is the first entry of its identity list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResolution {
    pub primary_name: Option<String>,
    pub primary_email: Option<String>,
    pub primary_phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMatrix {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Email,
    Phone,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DomainAssociation,
}

/// Builds profiles with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    config: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, store: &SourceResultStore) -> Profile {
        let identity = extract_identity(store);
        let data_quality = calculate_data_quality(store);
        let confidence = calculate_confidence(store);
        let risk_assessment = assess_risk(store);
        let entity_resolution = resolve_entities(&identity);
        let redacted = self.config.redact.then(|| redact_identity(&identity));

        let summary = ProfileSummary {
            total_sources: store.len(),
            data_quality: data_quality.clone(),
            confidence_score: confidence,
            domain: store.osint().and_then(|o| o.target.clone()),
            platforms_found: store.social().map(|s| s.platforms_found.len()),
            email: store.email().and_then(|e| e.email.clone()),
            phone: store.phone().and_then(|p| p.phone_number.clone()),
        };

        debug!(
            sources = store.len(),
            confidence,
            risk = risk_assessment.score,
            quality = data_quality.score,
            "built profile"
        );

        Profile {
            timestamp: store.collected_at(),
            summary,
            identity,
            online_presence: extract_online_presence(store),
            contact_information: extract_contact_information(store),
            technical_footprint: extract_technical_footprint(store),
            timeline: build_timeline(store),
            relationships: map_relationships(store),
            risk_assessment,
            confidence,
            confidence_explanation: explain_confidence(store),
            data_quality,
            entity_resolution,
            relation_matrix: export_relation_matrix(store),
            data_sources: store.sources().collect(),
            redacted,
        }
    }
}

/// Build a profile with the default configuration
pub fn build_profile(store: &SourceResultStore) -> Profile {
    ProfileBuilder::default().build(store)
}

/// Count filled top-level fields across every present source
pub fn calculate_data_quality(store: &SourceResultStore) -> DataQuality {
    let mut total_fields = 0usize;
    let mut filled_fields = 0usize;

    for (_, fields) in store.raw_fields() {
        for value in fields.values() {
            total_fields += 1;
            if is_filled(value) {
                filled_fields += 1;
            }
        }
    }

    let score = if total_fields == 0 {
        0.0
    } else {
        let ratio = filled_fields as f64 / total_fields as f64 * 100.0;
        (ratio * 100.0).round() / 100.0
    };

    DataQuality {
        score,
        total_fields,
        filled_fields,
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty() && s != UNKNOWN_PLACEHOLDER,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty() && !map.contains_key(ERROR_MARKER),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

pub fn calculate_confidence(store: &SourceResultStore) -> u8 {
    let mut confidence = BASE_CONFIDENCE;

    if store.len() > 3 {
        confidence += MANY_SOURCES_BONUS;
    }
    if store.email().is_some_and(|e| e.is_valid()) {
        confidence += VALID_EMAIL_BONUS;
    }
    if store.phone().is_some_and(|p| p.is_valid()) {
        confidence += VALID_PHONE_BONUS;
    }

    confidence.min(MAX_SCORE as u32) as u8
}

/// Human-readable reasons behind the confidence score
pub fn explain_confidence(store: &SourceResultStore) -> Vec<String> {
    let mut explanation = Vec::new();
    if store.email().is_some_and(|e| e.is_valid()) {
        explanation.push("Valid email increases confidence".to_string());
    }
    if store.phone().is_some_and(|p| p.is_valid()) {
        explanation.push("Valid phone increases confidence".to_string());
    }
    if store.social().is_some_and(|s| !s.platforms_found.is_empty()) {
        explanation.push("Active social presence increases confidence".to_string());
    }
    explanation
}

pub fn assess_risk(store: &SourceResultStore) -> RiskAssessment {
    let mut score: i64 = 0;
    let mut factors = Vec::new();

    if let Some(email) = store.email() {
        if email.in_breach() {
            score += BREACH_RISK;
            factors.push("Email found in data breaches".to_string());
        }
        if email.is_disposable() {
            score += DISPOSABLE_RISK;
            factors.push("Using disposable email".to_string());
        }
    }

    if let Some(risk) = store.phone().and_then(|p| p.risk_assessment.as_ref()) {
        score += risk.risk_score.unwrap_or(0).div_euclid(2);
        factors.extend(risk.risk_factors.iter().cloned());
    }

    if let Some(network) = store.network() {
        let open_ports = network.open_ports().len();
        if open_ports > OPEN_PORTS_THRESHOLD {
            score += OPEN_PORTS_RISK;
            factors.push(format!("Many open ports detected: {open_ports}"));
        }
    }

    RiskAssessment {
        score: score.clamp(0, MAX_SCORE as i64) as u8,
        level: RiskLevel::from_score(score),
        factors,
    }
}

pub fn extract_identity(store: &SourceResultStore) -> Identity {
    let mut identity = Identity::default();

    if let Some(social) = store.social() {
        if let Some(username) = &social.username {
            push_unique(&mut identity.usernames, username);
        }
        for profile in social.profiles.values() {
            if let Some(name) = profile.name() {
                push_unique(&mut identity.names, name);
            }
        }
    }

    if let Some(email) = store.email() {
        if let Some(address) = &email.email {
            push_unique(&mut identity.emails, address);
        }
        if let Some(domain) = email.domain() {
            identity.affiliations.push(Affiliation {
                kind: AffiliationKind::Domain,
                value: domain.to_string(),
            });
        }
    }

    if let Some(number) = store.phone().and_then(|p| p.phone_number.as_ref()) {
        push_unique(&mut identity.phone_numbers, number);
    }

    identity.aliases = discover_aliases(&identity.names);
    identity
}

/// "Jane Q Doe" becomes "Jane D."
pub fn discover_aliases(names: &[String]) -> Vec<String> {
    let mut aliases = Vec::new();
    for name in names {
        let parts: Vec<&str> = name.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let (Some(first), Some(initial)) = (parts.first(), parts.last().and_then(|l| l.chars().next()))
        else {
            continue;
        };
        push_unique(&mut aliases, &format!("{first} {initial}."));
    }
    aliases
}

pub fn extract_online_presence(store: &SourceResultStore) -> OnlinePresence {
    let mut presence = OnlinePresence::default();

    if let Some(social) = store.social() {
        for platform in &social.platforms_found {
            let profile = social.profile(platform);
            presence.social_media.insert(
                platform.clone(),
                PlatformPresence {
                    url: profile.and_then(|p| p.url.clone()),
                    active: profile.and_then(|p| p.exists).unwrap_or(false),
                },
            );
        }
    }

    if let Some(osint) = store.osint() {
        if let Some(target) = &osint.target {
            push_unique(&mut presence.domains, target);
        }
        for subdomain in &osint.subdomains {
            push_unique(&mut presence.websites, subdomain);
        }
    }

    presence
}

pub fn extract_contact_information(store: &SourceResultStore) -> ContactInformation {
    let mut contact = ContactInformation::default();

    if let Some(email) = store.email() {
        contact.emails.push(EmailContact {
            email: email.email.clone(),
            valid: email.is_valid(),
            disposable: email.is_disposable(),
        });
    }

    if let Some(phone) = store.phone() {
        contact.phone_numbers.push(PhoneContact {
            number: phone.phone_number.clone(),
            valid: phone.is_valid(),
            carrier: phone.carrier().map(str::to_string),
            location: phone.location_name().map(str::to_string),
        });
    }

    if let Some(social) = store.social() {
        if let Some(username) = &social.username {
            for platform in &social.platforms_found {
                contact
                    .social_handles
                    .insert(platform.clone(), username.clone());
            }
        }
    }

    contact
}

pub fn extract_technical_footprint(store: &SourceResultStore) -> TechnicalFootprint {
    let mut technical = TechnicalFootprint::default();

    if let Some(osint) = store.osint() {
        if let Some(ip) = osint.ip_address() {
            push_unique(&mut technical.ip_addresses, ip);
        }
        if let Some(target) = &osint.target {
            push_unique(&mut technical.domains, target);
        }
    }

    if let Some(network) = store.network() {
        if let Some(ip) = network.host_ip() {
            push_unique(&mut technical.ip_addresses, ip);
        }
        for port in network.open_ports() {
            if !technical.ports.contains(port) {
                technical.ports.push(port.clone());
            }
        }
    }

    technical
}

/// Date-bearing facts, newest first
pub fn build_timeline(store: &SourceResultStore) -> Vec<TimelineEvent> {
    let mut timeline = Vec::new();

    if let Some(date) = store.osint().and_then(|o| o.creation_date()) {
        timeline.push(TimelineEvent {
            date: date.to_string(),
            event: "Domain registered".to_string(),
            source: "WHOIS".to_string(),
            confidence: 0.9,
        });
    }

    if let Some(date) = store.metadata().and_then(|m| m.created()) {
        timeline.push(TimelineEvent {
            date: date.to_string(),
            event: "File created".to_string(),
            source: "file metadata".to_string(),
            confidence: 0.7,
        });
    }

    // stable: equal dates keep insertion order
    timeline.sort_by(|a, b| b.date.cmp(&a.date));
    timeline
}

/// The email domain when it is exactly the OSINT target
fn shared_domain(store: &SourceResultStore) -> Option<&str> {
    let email_domain = store.email()?.domain()?;
    let target = store.osint()?.target.as_deref()?;
    (email_domain == target).then_some(target)
}

pub fn map_relationships(store: &SourceResultStore) -> Relationships {
    let mut relationships = Relationships::default();

    if let Some(social) = store.social() {
        relationships.connections.push(Connection::SocialMedia {
            platforms: social.platforms_found.clone(),
        });
    }

    if let Some(domain) = shared_domain(store) {
        relationships.connections.push(Connection::DomainAssociation {
            entities: vec![domain.to_string(), domain.to_string()],
        });
        push_unique(&mut relationships.associated_entities, domain);
    }

    relationships
}

pub fn export_relation_matrix(store: &SourceResultStore) -> RelationMatrix {
    let mut matrix = RelationMatrix::default();

    let email = store.email().and_then(|e| e.email.as_ref());
    let phone = store.phone().and_then(|p| p.phone_number.as_ref());
    let domain = store.osint().and_then(|o| o.target.as_ref());

    if let Some(email) = email {
        matrix.nodes.push(GraphNode {
            id: email.clone(),
            kind: NodeKind::Email,
        });
    }
    if let Some(phone) = phone {
        matrix.nodes.push(GraphNode {
            id: phone.clone(),
            kind: NodeKind::Phone,
        });
    }
    if let Some(domain) = domain {
        matrix.nodes.push(GraphNode {
            id: domain.clone(),
            kind: NodeKind::Domain,
        });
    }

    if let (Some(email), Some(domain)) = (email, shared_domain(store)) {
        matrix.edges.push(GraphEdge {
            from: email.clone(),
            to: domain.to_string(),
            kind: EdgeKind::DomainAssociation,
        });
    }

    matrix
}

/// First-seen entry of each identity list
pub fn resolve_entities(identity: &Identity) -> EntityResolution {
    EntityResolution {
        primary_name: identity.names.first().cloned(),
        primary_email: identity.emails.first().cloned(),
        primary_phone: identity.phone_numbers.first().cloned(),
    }
}

fn redact_identity(identity: &Identity) -> Identity {
    let mut redacted = identity.clone();
    if !redacted.emails.is_empty() {
        redacted.emails = vec![REDACTED_EMAIL.to_string()];
    }
    if !redacted.phone_numbers.is_empty() {
        redacted.phone_numbers = vec![REDACTED_PHONE.to_string()];
    }
    redacted
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
