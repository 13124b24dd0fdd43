//! Submitter email normalization and syntax checks.
//!
//! Lowercasing applies to every address. Dot removal and sub-address
//! stripping only apply to providers known to treat those forms as the same
//! mailbox, so distinct mailboxes elsewhere are never merged.

use std::fmt;

use crate::error::AppError;

struct ProviderRule {
    domains: &'static [&'static str],
    canonical_domain: Option<&'static str>,
    strip_dots: bool,
    subaddress_separator: Option<char>,
}

const PROVIDER_RULES: &[ProviderRule] = &[
    ProviderRule {
        domains: &["gmail.com", "googlemail.com"],
        canonical_domain: Some("gmail.com"),
        strip_dots: true,
        subaddress_separator: Some('+'),
    },
    ProviderRule {
        domains: &["outlook.com", "outlook.it", "hotmail.com", "hotmail.it", "live.com", "live.it"],
        canonical_domain: None,
        strip_dots: false,
        subaddress_separator: Some('+'),
    },
    ProviderRule {
        domains: &["icloud.com", "me.com", "mac.com"],
        canonical_domain: None,
        strip_dots: false,
        subaddress_separator: Some('+'),
    },
    ProviderRule {
        domains: &["yahoo.com", "yahoo.it", "ymail.com"],
        canonical_domain: None,
        strip_dots: false,
        subaddress_separator: Some('-'),
    },
];

/// Canonical form of `raw`, or `None` when it has no usable local part or domain.
///
/// Applying it to its own output returns the same value.
pub fn normalize_email(raw: &str) -> Option<String> {
    let (local, domain) = raw.trim().rsplit_once('@')?;
    let mut local = local.to_lowercase();
    let mut domain = domain.to_lowercase();

    if let Some(rule) = PROVIDER_RULES
        .iter()
        .find(|rule| rule.domains.contains(&domain.as_str()))
    {
        if let Some(separator) = rule.subaddress_separator {
            if let Some(idx) = local.find(separator) {
                local.truncate(idx);
            }
        }
        if rule.strip_dots {
            local.retain(|c| c != '.');
        }
        if let Some(canonical) = rule.canonical_domain {
            domain = canonical.to_string();
        }
    }

    if local.is_empty() || domain.is_empty() {
        return None;
    }

    Some(format!("{local}@{domain}"))
}

/// Syntactic check: a well-formed address on a named host with a top-level domain.
pub fn is_valid_email(address: &str) -> bool {
    let Ok(parsed) = address.parse::<lettre::Address>() else {
        return false;
    };

    let domain = parsed.domain();
    if domain.starts_with('[') {
        return false;
    }

    has_top_level_domain(domain)
}

fn has_top_level_domain(domain: &str) -> bool {
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    if host.is_empty() || host.split('.').any(str::is_empty) {
        return false;
    }

    let alphabetic = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    let punycode = tld.len() > 4 && tld.starts_with("xn--");
    alphabetic || punycode
}

/// A submitter address that has been normalized and validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEmail(String);

impl NormalizedEmail {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        normalize_email(raw)
            .filter(|address| is_valid_email(address))
            .map(NormalizedEmail)
            .ok_or(AppError::InvalidEmail)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
