//! Third-party origin audit: groups observed network traffic by origin,
//! classifies risk, and attaches a reputation verdict.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use gasoline_types::NetworkBody;
use regex::Regex;
use serde::Serialize;

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap())
}

fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap())
}

fn ssn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap())
}

/// Curated set of known CDN/analytics origins treated as reputable by
/// default. Real deployments can extend this via custom allow/block lists.
const BUNDLED_CDN_ORIGINS: &[&str] = &[
    "cdn.jsdelivr.net",
    "cdnjs.cloudflare.com",
    "unpkg.com",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
    "www.google-analytics.com",
    "www.googletagmanager.com",
];

const ABUSE_TLDS: &[&str] = &["zip", "top", "xyz", "click", "gq", "tk"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reputation {
    Allowed,
    Blocked,
    BundledCdn,
    PossibleDga,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Shannon entropy of a string's byte distribution, used to flag
/// algorithmically-generated domain labels.
pub fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<u8, usize> = HashMap::new();
    for b in s.bytes() {
        *counts.entry(b).or_insert(0) += 1;
    }
    let len = s.len() as f64;
    -counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            p * p.log2()
        })
        .sum::<f64>()
}

fn first_label(origin: &str) -> &str {
    origin.split('.').next().unwrap_or(origin)
}

fn tld(origin: &str) -> Option<&str> {
    origin.rsplit('.').next()
}

/// Custom reputation lists a deployment can layer over the bundled CDN set
/// and entropy heuristics. Precedence: custom > bundled > heuristics.
#[derive(Debug, Clone, Default)]
pub struct ReputationLists {
    pub allow: HashSet<String>,
    pub block: HashSet<String>,
}

fn classify_reputation(origin: &str, lists: &ReputationLists) -> Reputation {
    if lists.allow.contains(origin) {
        return Reputation::Allowed;
    }
    if lists.block.contains(origin) {
        return Reputation::Blocked;
    }
    if BUNDLED_CDN_ORIGINS.contains(&origin) {
        return Reputation::BundledCdn;
    }
    let abuse_tld = tld(origin).map(|t| ABUSE_TLDS.contains(&t)).unwrap_or(false);
    let label = first_label(origin);
    if abuse_tld && label.len() > 8 && shannon_entropy(label) > 3.5 {
        return Reputation::PossibleDga;
    }
    Reputation::Unknown
}

/// Independent suspicion signals for an origin. Unlike [`Reputation`], each
/// flag stands on its own: an abuse-TLD match is reported even when the
/// label is too short or too low-entropy to also earn `possible_dga`.
fn suspicion_flags(origin: &str) -> HashSet<String> {
    let mut flags = HashSet::new();
    let abuse_tld = tld(origin).map(|t| ABUSE_TLDS.contains(&t)).unwrap_or(false);
    if abuse_tld {
        flags.insert("abuse_tld".to_string());
    }
    let label = first_label(origin);
    if abuse_tld && label.len() > 8 && shannon_entropy(label) > 3.5 {
        flags.insert("possible_dga".to_string());
    }
    flags
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginReport {
    pub origin: String,
    pub resource_types: HashMap<String, u32>,
    pub outbound: bool,
    pub pii_detected: bool,
    pub contains_pii_fields: Vec<String>,
    pub sets_cookies: bool,
    pub reputation: Reputation,
    pub suspicion_flags: HashSet<String>,
    #[serde(rename = "risk_level")]
    pub risk: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Returns the kinds of PII matched in `body` ("email", "phone", "ssn").
fn contains_pii(body: &str) -> Vec<&'static str> {
    let mut matched = Vec::new();
    if email_pattern().is_match(body) {
        matched.push("email");
    }
    if phone_pattern().is_match(body) {
        matched.push("phone");
    }
    if ssn_pattern().is_match(body) {
        matched.push("ssn");
    }
    matched
}

fn origin_of(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let host = without_scheme.split(['/', '?']).next()?;
    Some(host.to_string())
}

/// Classifies observed traffic against a set of first-party origins.
pub struct ThirdPartyAuditor {
    first_party: HashSet<String>,
    reputation_lists: ReputationLists,
}

impl ThirdPartyAuditor {
    pub fn new(first_party: HashSet<String>, reputation_lists: ReputationLists) -> Self {
        Self {
            first_party,
            reputation_lists,
        }
    }

    fn is_script_request(body: &NetworkBody) -> bool {
        body.content_type
            .as_deref()
            .map(|ct| ct.contains("javascript") || ct.contains("ecmascript"))
            .unwrap_or(false)
    }

    /// Group bodies by third-party origin and produce one report per origin.
    pub fn audit(&self, bodies: &[NetworkBody]) -> Vec<OriginReport> {
        let mut grouped: HashMap<String, Vec<&NetworkBody>> = HashMap::new();
        for body in bodies {
            let Some(origin) = origin_of(&body.url) else {
                continue;
            };
            if self.first_party.contains(&origin) {
                continue;
            }
            grouped.entry(origin).or_default().push(body);
        }

        let mut reports: Vec<OriginReport> = grouped
            .into_iter()
            .map(|(origin, bodies)| self.build_report(origin, &bodies))
            .collect();
        reports.sort_by(|a, b| a.origin.cmp(&b.origin));
        reports
    }

    fn build_report(&self, origin: String, bodies: &[&NetworkBody]) -> OriginReport {
        let mut resource_types = HashMap::new();
        let mut outbound = false;
        let mut pii_fields: HashSet<String> = HashSet::new();
        let mut sets_cookies = false;
        let mut has_scripts = false;

        for body in bodies {
            let content_type = body.content_type.clone().unwrap_or_else(|| "unknown".to_string());
            *resource_types.entry(content_type).or_insert(0) += 1;

            if matches!(body.method.as_str(), "POST" | "PUT" | "PATCH") {
                outbound = true;
            }
            if let Some(req) = &body.request_body {
                pii_fields.extend(contains_pii(req).into_iter().map(str::to_string));
            }
            if body.response_headers.contains_key("set-cookie") {
                sets_cookies = true;
            }
            if Self::is_script_request(body) {
                has_scripts = true;
            }
        }

        let pii_detected = !pii_fields.is_empty();
        let mut contains_pii_fields: Vec<String> = pii_fields.into_iter().collect();
        contains_pii_fields.sort();

        let reputation = classify_reputation(&origin, &self.reputation_lists);
        let suspicion_flags = suspicion_flags(&origin);

        let risk = if reputation == Reputation::Blocked {
            RiskLevel::Critical
        } else if has_scripts && outbound {
            RiskLevel::Critical
        } else if has_scripts {
            RiskLevel::High
        } else if outbound || sets_cookies {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let mut recommendations = Vec::new();
        if reputation == Reputation::PossibleDga && has_scripts {
            recommendations.push(format!(
                "{origin} serves scripts and has a suspicious domain name; consider blocking"
            ));
        }
        if outbound && pii_detected {
            recommendations.push(format!("{origin} receives PII in outbound requests"));
        } else if outbound {
            recommendations.push(format!("{origin} receives outbound data from this page"));
        }
        if sets_cookies {
            recommendations.push(format!("{origin} sets cookies on this page"));
        }

        OriginReport {
            origin,
            resource_types,
            outbound,
            pii_detected,
            contains_pii_fields,
            sets_cookies,
            reputation,
            suspicion_flags,
            risk,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn body(url: &str, method: &str, content_type: &str) -> NetworkBody {
        NetworkBody {
            tab_id: 1,
            url: url.to_string(),
            method: method.to_string(),
            status: 200,
            duration_ms: 5.0,
            request_body: None,
            response_body: None,
            content_type: Some(content_type.to_string()),
            response_headers: Default::default(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn excludes_first_party_origins() {
        let mut first_party = HashSet::new();
        first_party.insert("app.example.com".to_string());
        let auditor = ThirdPartyAuditor::new(first_party, ReputationLists::default());
        let bodies = vec![body("https://app.example.com/api", "GET", "application/json")];
        assert!(auditor.audit(&bodies).is_empty());
    }

    #[test]
    fn classifies_script_and_outbound_as_critical() {
        let auditor = ThirdPartyAuditor::new(HashSet::new(), ReputationLists::default());
        let bodies = vec![body("https://tracker.example.net/x", "POST", "application/javascript")];
        let reports = auditor.audit(&bodies);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].risk, RiskLevel::Critical);
    }

    #[test]
    fn bundled_cdn_is_recognized() {
        let auditor = ThirdPartyAuditor::new(HashSet::new(), ReputationLists::default());
        let bodies = vec![body("https://cdn.jsdelivr.net/npm/lib.js", "GET", "application/javascript")];
        let reports = auditor.audit(&bodies);
        assert_eq!(reports[0].reputation, Reputation::BundledCdn);
    }

    #[test]
    fn high_entropy_abuse_tld_flagged_as_dga() {
        let label = "zx7qm3kvb9wt";
        let origin = format!("{label}.top");
        assert!(shannon_entropy(label) > 3.5);
        let auditor = ThirdPartyAuditor::new(HashSet::new(), ReputationLists::default());
        let bodies = vec![body(&format!("https://{origin}/p"), "GET", "text/plain")];
        let reports = auditor.audit(&bodies);
        assert_eq!(reports[0].reputation, Reputation::PossibleDga);
    }

    #[test]
    fn short_label_abuse_tld_still_flags_suspicion() {
        let auditor = ThirdPartyAuditor::new(HashSet::new(), ReputationLists::default());
        let bodies = vec![body("https://tracker.xyz/p", "GET", "text/plain")];
        let reports = auditor.audit(&bodies);
        assert_eq!(reports[0].reputation, Reputation::Unknown);
        assert!(reports[0].suspicion_flags.contains("abuse_tld"));
        assert!(!reports[0].suspicion_flags.contains("possible_dga"));
    }

    #[test]
    fn pii_fields_are_individually_reported() {
        let auditor = ThirdPartyAuditor::new(HashSet::new(), ReputationLists::default());
        let mut req = body("https://collector.example.net/x", "POST", "application/json");
        req.request_body = Some("email=user@example.com&phone=415-555-0100".to_string());
        let reports = auditor.audit(&[req]);
        assert!(reports[0].pii_detected);
        assert_eq!(reports[0].contains_pii_fields, vec!["email", "phone"]);
    }

    #[test]
    fn custom_block_list_forces_critical() {
        let mut lists = ReputationLists::default();
        lists.block.insert("evil.example.com".to_string());
        let auditor = ThirdPartyAuditor::new(HashSet::new(), lists);
        let bodies = vec![body("https://evil.example.com/x", "GET", "text/plain")];
        let reports = auditor.audit(&bodies);
        assert_eq!(reports[0].risk, RiskLevel::Critical);
    }
}
