//! Target classification and input validation
//!
//! Used at the edge, before any collector runs, to decide what kind of
//! target a raw string names.

use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$").unwrap()
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

static PHONE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-()]").unwrap());

const DANGEROUS_CHARS: &[char] = &['<', '>', '&', '"', '\'', ';', '|', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Domain,
    Email,
    Phone,
    Ip,
    Username,
    File,
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Domain => "domain",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Ip => "ip",
            Self::Username => "username",
            Self::File => "file",
        };
        write!(f, "{name}")
    }
}

/// A target as handed to collectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub value: String,
}

impl Target {
    pub fn new(kind: TargetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Classify a raw string. Files are never detected here since that needs
    /// the filesystem; callers construct them with [`Target::new`].
    pub fn detect(raw: &str) -> Self {
        let value = raw.trim();
        Self::new(classify(value), value)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Checked in order: ip, email, phone, domain. Anything else is a username.
pub fn classify(value: &str) -> TargetKind {
    if is_valid_ip(value) {
        TargetKind::Ip
    } else if is_valid_email(value) {
        TargetKind::Email
    } else if is_valid_phone(value) {
        TargetKind::Phone
    } else if is_valid_domain(value) {
        TargetKind::Domain
    } else {
        TargetKind::Username
    }
}

pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_REGEX.is_match(domain)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn is_valid_ip(ip: &str) -> bool {
    ip.parse::<IpAddr>().is_ok()
}

pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned = PHONE_SEPARATORS.replace_all(phone, "");
    PHONE_REGEX.is_match(&cleaned)
}

/// Strip shell and markup metacharacters
pub fn sanitize_input(input: &str) -> String {
    input.chars().filter(|c| !DANGEROUS_CHARS.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validators() {
        assert!(is_valid_domain("example.com"));
        assert!(!is_valid_domain("invalid domain"));
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid-email"));
        assert!(is_valid_ip("192.168.1.1"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip("999.999.999.999"));
        assert!(is_valid_phone("+12345678900"));
        assert!(is_valid_phone("+1 (415) 555-0100"));
        assert!(!is_valid_phone("+0123"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("8.8.8.8"), TargetKind::Ip);
        assert_eq!(classify("jane@acme.org"), TargetKind::Email);
        assert_eq!(classify("+14155550100"), TargetKind::Phone);
        assert_eq!(classify("acme.org"), TargetKind::Domain);
        assert_eq!(classify("janedoe"), TargetKind::Username);
    }

    #[test]
    fn test_detect_trims() {
        let target = Target::detect("  acme.org \n");
        assert_eq!(target, Target::new(TargetKind::Domain, "acme.org"));
        assert_eq!(target.to_string(), "domain:acme.org");
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("jdoe; rm -rf /"), "jdoe rm -rf /");
        assert_eq!(sanitize_input("<script>"), "script");
    }
}
