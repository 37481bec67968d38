//! Source result store - collector output validated once at the boundary
//!
//! Collectors hand over loosely structured JSON, one object per source.
//! On insertion each object is decoded into a typed record whose fields are
//! all optional. Sub-results are decoded independently, so one malformed or
//! error-flagged entry never takes the rest of the source down with it.
//!
//! The raw field map is kept next to the typed record because data quality
//! scoring looks at every top-level field, not only the ones the core reads.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ERROR_MARKER;

/// Collector categories known to the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Email,
    Phone,
    Osint,
    Social,
    Network,
    Metadata,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Email,
        SourceKind::Phone,
        SourceKind::Osint,
        SourceKind::Social,
        SourceKind::Network,
        SourceKind::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Osint => "osint",
            Self::Social => "social",
            Self::Network => "network",
            Self::Metadata => "metadata",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "osint" | "domain" => Ok(Self::Osint),
            "social" => Ok(Self::Social),
            "network" => Ok(Self::Network),
            "metadata" => Ok(Self::Metadata),
            _ => Err(SourceError::UnknownSource(s.to_string())),
        }
    }
}

/// Errors raised at the collector boundary
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("source result store must be a JSON object")]
    NotAnObject,

    #[error("result for source '{0}' must be a JSON object")]
    SourceNotAnObject(SourceKind),
}

/// True when a value is a nested result that reported a failure
pub fn is_error_marker(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key(ERROR_MARKER))
}

// ---------------------------------------------------------------------------
// Sub-results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidityCheck {
    pub valid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BreachCheck {
    pub found: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisposableCheck {
    #[serde(alias = "is_disposable")]
    pub is_disposable: Option<bool>,
}

/// Risk verdict computed by the phone collector
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhoneRisk {
    #[serde(alias = "risk_score")]
    pub risk_score: Option<i64>,
    #[serde(alias = "risk_factors")]
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarrierInfo {
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhoneLocation {
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WhoisInfo {
    #[serde(alias = "creation_date")]
    pub creation_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IpInfo {
    #[serde(alias = "ip_address")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfileData {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// One platform entry from the social collector
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SocialProfile {
    pub url: Option<String>,
    pub exists: Option<bool>,
    pub data: Option<ProfileData>,
}

impl SocialProfile {
    pub fn name(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

/// An open port reported by the network collector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenPort {
    pub port: u16,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortScan {
    #[serde(alias = "open_ports", deserialize_with = "lenient_list")]
    pub open_ports: Vec<OpenPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostInfo {
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileBasicInfo {
    pub created: Option<String>,
}

// ---------------------------------------------------------------------------
// Per-source records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailResult {
    pub email: Option<String>,
    pub valid: Option<ValidityCheck>,
    pub breach_check: Option<BreachCheck>,
    pub disposable: Option<DisposableCheck>,
}

impl EmailResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let source = SourceKind::Email;
        Self {
            email: text(fields, "email"),
            valid: section(source, fields, "valid"),
            breach_check: section(source, fields, "breachCheck"),
            disposable: section(source, fields, "disposable"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.as_ref().and_then(|v| v.valid).unwrap_or(false)
    }

    pub fn in_breach(&self) -> bool {
        self.breach_check
            .as_ref()
            .and_then(|b| b.found)
            .unwrap_or(false)
    }

    pub fn is_disposable(&self) -> bool {
        self.disposable
            .as_ref()
            .and_then(|d| d.is_disposable)
            .unwrap_or(false)
    }

    /// Domain part of the address, if it has one
    pub fn domain(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|e| e.rsplit_once('@'))
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneResult {
    pub phone_number: Option<String>,
    pub validation: Option<ValidityCheck>,
    pub risk_assessment: Option<PhoneRisk>,
    pub carrier_info: Option<CarrierInfo>,
    pub location: Option<PhoneLocation>,
}

impl PhoneResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let source = SourceKind::Phone;
        Self {
            phone_number: text(fields, "phoneNumber"),
            validation: section(source, fields, "validation"),
            risk_assessment: section(source, fields, "riskAssessment"),
            carrier_info: section(source, fields, "carrierInfo"),
            location: section(source, fields, "location"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().and_then(|v| v.valid).unwrap_or(false)
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier_info.as_ref().and_then(|c| c.carrier.as_deref())
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.location.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsintResult {
    pub target: Option<String>,
    pub whois: Option<WhoisInfo>,
    pub ip_info: Option<IpInfo>,
    /// Only the presence of an `sslInfo` entry matters, not its content
    pub has_ssl_info: bool,
    pub subdomains: Vec<String>,
}

impl OsintResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let source = SourceKind::Osint;
        Self {
            target: text(fields, "target"),
            whois: section(source, fields, "whois"),
            ip_info: section(source, fields, "ipInfo"),
            has_ssl_info: lookup(fields, "sslInfo").is_some(),
            subdomains: list(source, fields, "subdomains"),
        }
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_info.as_ref().and_then(|i| i.ip_address.as_deref())
    }

    pub fn creation_date(&self) -> Option<&str> {
        self.whois.as_ref().and_then(|w| w.creation_date.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialResult {
    pub username: Option<String>,
    pub platforms_found: Vec<String>,
    /// Keyed by platform name; iteration order is ascending platform name
    pub profiles: BTreeMap<String, SocialProfile>,
}

impl SocialResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let source = SourceKind::Social;
        let mut profiles = BTreeMap::new();
        if let Some(raw) = section::<Map<String, Value>>(source, fields, "profiles") {
            for (platform, value) in raw {
                if is_error_marker(&value) {
                    debug!(%source, %platform, "profile lookup reported an error");
                    continue;
                }
                match serde_json::from_value::<SocialProfile>(value) {
                    Ok(profile) => {
                        profiles.insert(platform, profile);
                    }
                    Err(e) => warn!(%source, %platform, error = %e, "discarding malformed profile"),
                }
            }
        }

        Self {
            username: text(fields, "username"),
            platforms_found: list(source, fields, "platformsFound"),
            profiles,
        }
    }

    pub fn profile(&self, platform: &str) -> Option<&SocialProfile> {
        self.profiles.get(platform)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkResult {
    pub ports: Option<PortScan>,
    pub host_info: Option<HostInfo>,
}

impl NetworkResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let source = SourceKind::Network;
        Self {
            ports: section(source, fields, "ports"),
            host_info: section(source, fields, "hostInfo"),
        }
    }

    pub fn open_ports(&self) -> &[OpenPort] {
        self.ports
            .as_ref()
            .map(|p| p.open_ports.as_slice())
            .unwrap_or_default()
    }

    pub fn host_ip(&self) -> Option<&str> {
        self.host_info.as_ref().and_then(|h| h.ip.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataResult {
    pub file_name: Option<String>,
    pub basic_info: Option<FileBasicInfo>,
}

impl MetadataResult {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            file_name: text(fields, "fileName"),
            basic_info: section(SourceKind::Metadata, fields, "basicInfo"),
        }
    }

    pub fn created(&self) -> Option<&str> {
        self.basic_info.as_ref().and_then(|b| b.created.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Everything the collectors produced for one target at one point in time
#[derive(Debug, Clone)]
pub struct SourceResultStore {
    collected_at: DateTime<Utc>,
    raw: BTreeMap<SourceKind, Map<String, Value>>,
    email: Option<EmailResult>,
    phone: Option<PhoneResult>,
    osint: Option<OsintResult>,
    social: Option<SocialResult>,
    network: Option<NetworkResult>,
    metadata: Option<MetadataResult>,
}

impl SourceResultStore {
    /// Create an empty store stamped with the join time
    pub fn new(collected_at: DateTime<Utc>) -> Self {
        Self {
            collected_at,
            raw: BTreeMap::new(),
            email: None,
            phone: None,
            osint: None,
            social: None,
            network: None,
            metadata: None,
        }
    }

    /// Build a store from a JSON object keyed by source name.
    ///
    /// Unknown source names are skipped with a warning. A source whose value
    /// is not an object is skipped the same way.
    pub fn from_json(value: &Value, collected_at: DateTime<Utc>) -> Result<Self, SourceError> {
        let obj = value.as_object().ok_or(SourceError::NotAnObject)?;
        let mut store = Self::new(collected_at);
        for (name, result) in obj {
            let source = match name.parse::<SourceKind>() {
                Ok(source) => source,
                Err(e) => {
                    warn!(error = %e, "skipping source");
                    continue;
                }
            };
            if let Err(e) = store.insert(source, result.clone()) {
                warn!(error = %e, "skipping source");
            }
        }
        Ok(store)
    }

    /// Validate and store one collector result, replacing any previous one
    pub fn insert(&mut self, source: SourceKind, value: Value) -> Result<(), SourceError> {
        let Value::Object(fields) = value else {
            return Err(SourceError::SourceNotAnObject(source));
        };

        match source {
            SourceKind::Email => self.email = Some(EmailResult::from_fields(&fields)),
            SourceKind::Phone => self.phone = Some(PhoneResult::from_fields(&fields)),
            SourceKind::Osint => self.osint = Some(OsintResult::from_fields(&fields)),
            SourceKind::Social => self.social = Some(SocialResult::from_fields(&fields)),
            SourceKind::Network => self.network = Some(NetworkResult::from_fields(&fields)),
            SourceKind::Metadata => self.metadata = Some(MetadataResult::from_fields(&fields)),
        }
        debug!(%source, fields = fields.len(), "source result accepted");
        self.raw.insert(source, fields);
        Ok(())
    }

    /// Builder-style insert
    pub fn with_source(mut self, source: SourceKind, value: Value) -> Result<Self, SourceError> {
        self.insert(source, value)?;
        Ok(self)
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Number of sources present
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn contains(&self, source: SourceKind) -> bool {
        self.raw.contains_key(&source)
    }

    /// Present sources in canonical order
    pub fn sources(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.raw.keys().copied()
    }

    /// Raw top-level fields of every present source
    pub fn raw_fields(&self) -> impl Iterator<Item = (SourceKind, &Map<String, Value>)> {
        self.raw.iter().map(|(source, fields)| (*source, fields))
    }

    pub fn email(&self) -> Option<&EmailResult> {
        self.email.as_ref()
    }

    pub fn phone(&self) -> Option<&PhoneResult> {
        self.phone.as_ref()
    }

    pub fn osint(&self) -> Option<&OsintResult> {
        self.osint.as_ref()
    }

    pub fn social(&self) -> Option<&SocialResult> {
        self.social.as_ref()
    }

    pub fn network(&self) -> Option<&NetworkResult> {
        self.network.as_ref()
    }

    pub fn metadata(&self) -> Option<&MetadataResult> {
        self.metadata.as_ref()
    }
}

/// Look up a field by its camelCase name, falling back to snake_case
fn lookup<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).or_else(|| fields.get(&to_snake_case(key)))
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    lookup(fields, key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decode one sub-result. Error markers and malformed values yield `None`.
fn section<T: DeserializeOwned>(
    source: SourceKind,
    fields: &Map<String, Value>,
    key: &str,
) -> Option<T> {
    let value = lookup(fields, key)?;
    if value.is_null() {
        return None;
    }
    if is_error_marker(value) {
        debug!(%source, field = key, "sub-result reported an error");
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(%source, field = key, error = %e, "discarding malformed sub-result");
            None
        }
    }
}

/// Decode a list sub-result one element at a time. Malformed elements are
/// dropped; the rest survive.
fn list<T: DeserializeOwned>(source: SourceKind, fields: &Map<String, Value>, key: &str) -> Vec<T> {
    match lookup(fields, key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => decode_items(items.iter().cloned()),
        Some(value) if is_error_marker(value) => {
            debug!(%source, field = key, "sub-result reported an error");
            Vec::new()
        }
        Some(_) => {
            warn!(%source, field = key, "discarding sub-result that is not a list");
            Vec::new()
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: impl IntoIterator<Item = Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "discarding malformed list entry");
                None
            }
        })
        .collect()
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(decode_items(items))
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SourceResultStore {
        SourceResultStore::new(Utc::now())
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!("email".parse::<SourceKind>().unwrap(), SourceKind::Email);
        assert_eq!(" Social ".parse::<SourceKind>().unwrap(), SourceKind::Social);
        assert!("weather".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_camel_and_snake_case_fields() {
        let camel = store()
            .with_source(
                SourceKind::Email,
                json!({"email": "a@b.io", "breachCheck": {"found": true}}),
            )
            .unwrap();
        let snake = store()
            .with_source(
                SourceKind::Email,
                json!({"email": "a@b.io", "breach_check": {"found": true}}),
            )
            .unwrap();

        assert!(camel.email().unwrap().in_breach());
        assert!(snake.email().unwrap().in_breach());
    }

    #[test]
    fn test_error_marker_becomes_absent() {
        let s = store()
            .with_source(
                SourceKind::Osint,
                json!({
                    "target": "example.com",
                    "whois": {"error": "timeout"},
                    "ipInfo": {"ipAddress": "93.184.216.34"}
                }),
            )
            .unwrap();

        let osint = s.osint().unwrap();
        assert!(osint.whois.is_none());
        assert_eq!(osint.ip_address(), Some("93.184.216.34"));
    }

    #[test]
    fn test_malformed_sub_result_does_not_poison_source() {
        let s = store()
            .with_source(
                SourceKind::Network,
                json!({
                    "ports": {"openPorts": "not a list"},
                    "hostInfo": {"ip": "10.0.0.1"}
                }),
            )
            .unwrap();

        let network = s.network().unwrap();
        assert!(network.open_ports().is_empty());
        assert_eq!(network.host_ip(), Some("10.0.0.1"));
    }

    #[test]
    fn test_malformed_profile_is_skipped() {
        let s = store()
            .with_source(
                SourceKind::Social,
                json!({
                    "username": "jdoe",
                    "profiles": {
                        "github": {"url": "https://github.com/jdoe", "exists": true},
                        "twitter": {"url": 42},
                        "reddit": {"error": "rate limited"}
                    }
                }),
            )
            .unwrap();

        let social = s.social().unwrap();
        assert_eq!(social.profiles.len(), 1);
        assert!(social.profile("github").is_some());
    }

    #[test]
    fn test_malformed_list_entries_are_dropped_individually() {
        let mut ports: Vec<Value> = (1..=12)
            .map(|port| json!({"port": port, "service": "tcp"}))
            .collect();
        ports.push(json!({"port": 8080, "service": null}));
        ports.push(json!({"port": "http"}));

        let s = store()
            .with_source(SourceKind::Network, json!({"ports": {"openPorts": ports}}))
            .unwrap()
            .with_source(
                SourceKind::Social,
                json!({"platformsFound": ["github", null, 7, "gitlab"]}),
            )
            .unwrap()
            .with_source(
                SourceKind::Osint,
                json!({"subdomains": ["www.acme.org", {"host": "mail"}]}),
            )
            .unwrap();

        let open_ports = s.network().unwrap().open_ports();
        assert_eq!(open_ports.len(), 13);
        assert_eq!(
            open_ports[12],
            OpenPort {
                port: 8080,
                service: String::new()
            }
        );
        assert_eq!(s.social().unwrap().platforms_found, vec!["github", "gitlab"]);
        assert_eq!(s.osint().unwrap().subdomains, vec!["www.acme.org"]);
    }

    #[test]
    fn test_list_field_with_wrong_shape_is_empty() {
        let s = store()
            .with_source(
                SourceKind::Social,
                json!({"platformsFound": "github", "username": "jdoe"}),
            )
            .unwrap();
        let social = s.social().unwrap();
        assert!(social.platforms_found.is_empty());
        assert_eq!(social.username.as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_ssl_info_presence_only() {
        let s = store()
            .with_source(SourceKind::Osint, json!({"sslInfo": {"error": "handshake"}}))
            .unwrap();
        assert!(s.osint().unwrap().has_ssl_info);
    }

    #[test]
    fn test_from_json_skips_unknown_and_non_objects() {
        let raw = json!({
            "email": {"email": "x@y.com"},
            "weather": {"sunny": true},
            "phone": "+15550100"
        });
        let s = SourceResultStore::from_json(&raw, Utc::now()).unwrap();
        assert_eq!(s.len(), 1);
        assert!(s.contains(SourceKind::Email));
        assert!(!s.contains(SourceKind::Phone));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let result = SourceResultStore::from_json(&json!([1, 2, 3]), Utc::now());
        assert!(matches!(result, Err(SourceError::NotAnObject)));
    }

    #[test]
    fn test_email_domain() {
        let s = store()
            .with_source(SourceKind::Email, json!({"email": "jane@acme.org"}))
            .unwrap();
        assert_eq!(s.email().unwrap().domain(), Some("acme.org"));

        let bare = store()
            .with_source(SourceKind::Email, json!({"email": "not-an-address"}))
            .unwrap();
        assert_eq!(bare.email().unwrap().domain(), None);
    }
}
