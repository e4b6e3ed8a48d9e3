//! Service enumeration and the `/about.json` discovery document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// External services an action can be registered against.
///
/// Declaration order is the fetch order used when hook collections are
/// concatenated, so `Ord` doubles as that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Github,
    Gmail,
    Microsoft,
    Discord,
    Jira,
    Twitch,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 6] = [
        ServiceKind::Github,
        ServiceKind::Gmail,
        ServiceKind::Microsoft,
        ServiceKind::Discord,
        ServiceKind::Jira,
        ServiceKind::Twitch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Github => "github",
            ServiceKind::Gmail => "gmail",
            ServiceKind::Microsoft => "microsoft",
            ServiceKind::Discord => "discord",
            ServiceKind::Jira => "jira",
            ServiceKind::Twitch => "twitch",
        }
    }

    /// Human-facing product name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Github => "GitHub",
            ServiceKind::Gmail => "Gmail",
            ServiceKind::Microsoft => "Microsoft",
            ServiceKind::Discord => "Discord",
            ServiceKind::Jira => "Jira",
            ServiceKind::Twitch => "Twitch",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service '{0}'")]
pub struct UnknownService(pub String);

impl FromStr for ServiceKind {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownService(s.to_string()))
    }
}

/// One action or reaction advertised by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCapability {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutService {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ServiceCapability>,
    #[serde(default)]
    pub reactions: Vec<ServiceCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutServer {
    #[serde(default)]
    pub services: Vec<AboutService>,
}

/// `/about.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutResponse {
    #[serde(default)]
    pub server: AboutServer,
}

impl AboutResponse {
    pub fn services(&self) -> &[AboutService] {
        &self.server.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_names_case_insensitively() {
        assert_eq!("github".parse::<ServiceKind>(), Ok(ServiceKind::Github));
        assert_eq!(" Twitch ".parse::<ServiceKind>(), Ok(ServiceKind::Twitch));
        assert_eq!(
            "slack".parse::<ServiceKind>(),
            Err(UnknownService("slack".to_string()))
        );
    }

    #[test]
    fn ordering_matches_fetch_order() {
        let mut kinds = vec![ServiceKind::Twitch, ServiceKind::Github, ServiceKind::Microsoft];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![ServiceKind::Github, ServiceKind::Microsoft, ServiceKind::Twitch]
        );
    }

    #[test]
    fn about_document_tolerates_missing_lists() {
        let about: AboutResponse = serde_json::from_str(
            r#"{"server":{"services":[{"name":"jira","actions":[{"name":"issue_created","description":"New issue"}]}]}}"#,
        )
        .unwrap();
        let jira = &about.services()[0];
        assert_eq!(jira.name, "jira");
        assert_eq!(jira.actions.len(), 1);
        assert!(jira.reactions.is_empty());
    }
}
