//! Client side of the external edge-security decision service.
//!
//! The service evaluates a rule set (shield, bot detection, sliding-window
//! rate limits) against the details of one request and answers with a
//! conclusion. All decisioning happens remotely; this module only describes
//! the rules, ships the request details and interprets the answer.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProtectionConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Denials are enforced.
    Live,
    /// Denials are only reported.
    DryRun,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rule {
    Shield {
        mode: Mode,
    },
    DetectBot {
        mode: Mode,
        allow: Vec<String>,
    },
    SlidingWindow {
        mode: Mode,
        /// Window length, e.g. `"1m"`.
        interval: String,
        max: u32,
        name: String,
    },
}

/// Rules applied to every request before the per-role window is added.
pub fn base_rules() -> Vec<Rule> {
    vec![
        Rule::Shield { mode: Mode::Live },
        Rule::DetectBot {
            mode: Mode::Live,
            allow: vec!["CATEGORY:SEARCH_ENGINE".into(), "CATEGORY:PREVIEW".into()],
        },
    ]
}

/// What the decision service needs to know about the inbound request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequestDetails {
    pub ip: String,
    pub method: String,
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestDetails {
    pub fn user_agent(&self) -> &str {
        self.headers.get("user-agent").map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    RateLimit,
    Bot,
    Shield,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenialReason),
    /// The service could not reach a verdict; it fails open.
    Error,
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProtectionError {
    #[error("decision service unreachable: {0}")]
    Transport(String),
    #[error("decision service returned status {0}")]
    Status(u16),
    #[error("malformed decision: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ProtectionClient: Send + Sync {
    async fn protect(&self, details: &RequestDetails, rules: &[Rule]) -> Result<Decision, ProtectionError>;
}

// ---------------- HTTP client -----------------------

#[derive(Serialize)]
struct DecideRequest<'a> {
    details: &'a RequestDetails,
    rules: &'a [Rule],
}

#[derive(Deserialize)]
struct DecideResponse {
    decision: WireDecision,
}

#[derive(Deserialize)]
struct WireDecision {
    conclusion: String,
    #[serde(default)]
    reason: Option<WireReason>,
}

#[derive(Deserialize)]
struct WireReason {
    #[serde(rename = "type")]
    kind: String,
}

impl WireDecision {
    fn into_decision(self) -> Result<Decision, ProtectionError> {
        match self.conclusion.as_str() {
            // A challenge is not a denial; the request proceeds.
            "ALLOW" | "CHALLENGE" => Ok(Decision::Allow),
            "ERROR" => Ok(Decision::Error),
            "DENY" => {
                let reason = match self.reason.as_ref().map(|r| r.kind.as_str()) {
                    Some("RATE_LIMIT") => DenialReason::RateLimit,
                    Some("BOT") => DenialReason::Bot,
                    Some("SHIELD") => DenialReason::Shield,
                    _ => DenialReason::Other,
                };
                Ok(Decision::Deny(reason))
            }
            other => Err(ProtectionError::Decode(format!("unknown conclusion {other:?}"))),
        }
    }
}

/// Talks to the decide endpoint over HTTPS with the site key as bearer token.
#[derive(Clone)]
pub struct HttpProtectionClient {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl HttpProtectionClient {
    pub fn new(cfg: &ProtectionConfig) -> Result<Self, ProtectionError> {
        Self::with_timeout(&cfg.base_url, &cfg.key, cfg.timeout)
    }

    pub fn with_timeout(base_url: &str, key: &str, timeout: Duration) -> Result<Self, ProtectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProtectionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/decide", base_url.trim_end_matches('/')),
            key: key.to_owned(),
        })
    }
}

#[async_trait]
impl ProtectionClient for HttpProtectionClient {
    async fn protect(&self, details: &RequestDetails, rules: &[Rule]) -> Result<Decision, ProtectionError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.key)
            .json(&DecideRequest { details, rules })
            .send()
            .await
            .map_err(|e| ProtectionError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ProtectionError::Status(resp.status().as_u16()));
        }
        let body: DecideResponse = resp
            .json()
            .await
            .map_err(|e| ProtectionError::Decode(e.to_string()))?;
        body.decision.into_decision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(conclusion: &str, reason: Option<&str>) -> WireDecision {
        WireDecision {
            conclusion: conclusion.into(),
            reason: reason.map(|k| WireReason { kind: k.into() }),
        }
    }

    #[test]
    fn conclusions_map_to_decisions() {
        assert_eq!(wire("ALLOW", None).into_decision().unwrap(), Decision::Allow);
        assert_eq!(wire("ERROR", None).into_decision().unwrap(), Decision::Error);
        assert_eq!(
            wire("DENY", Some("RATE_LIMIT")).into_decision().unwrap(),
            Decision::Deny(DenialReason::RateLimit)
        );
        assert_eq!(wire("DENY", Some("BOT")).into_decision().unwrap(), Decision::Deny(DenialReason::Bot));
        assert_eq!(wire("DENY", Some("SHIELD")).into_decision().unwrap(), Decision::Deny(DenialReason::Shield));
        assert_eq!(wire("DENY", Some("EMAIL")).into_decision().unwrap(), Decision::Deny(DenialReason::Other));
        assert!(wire("MAYBE", None).into_decision().is_err());
    }

    #[test]
    fn challenge_is_not_a_denial() {
        let d = wire("CHALLENGE", Some("BOT")).into_decision().unwrap();
        assert_eq!(d, Decision::Allow);
        assert!(!d.is_denied());
    }

    #[test]
    fn rules_serialize_with_type_tag() {
        let rule = Rule::SlidingWindow { mode: Mode::Live, interval: "1m".into(), max: 5, name: "guest-rate-limit".into() };
        let v = serde_json::to_value(&rule).unwrap();
        assert_eq!(v["type"], "SLIDING_WINDOW");
        assert_eq!(v["mode"], "LIVE");
        assert_eq!(v["max"], 5);
        assert_eq!(v["name"], "guest-rate-limit");
    }

    #[test]
    fn base_rules_shield_and_bots() {
        let rules = base_rules();
        assert_eq!(rules.len(), 2);
        assert!(matches!(rules[0], Rule::Shield { mode: Mode::Live }));
        match &rules[1] {
            Rule::DetectBot { allow, .. } => assert!(allow.iter().any(|a| a == "CATEGORY:SEARCH_ENGINE")),
            other => panic!("unexpected rule {other:?}"),
        }
    }
}
