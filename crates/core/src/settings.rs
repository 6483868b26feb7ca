//! Site-wide settings toggled from the admin dashboard.

use serde::{Deserialize, Serialize};

/// Sender name used when none is configured.
pub const DEFAULT_SENDER_NAME: &str = "Sareine";

/// Storefront-wide switches. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    /// Whether the preorder flow replaces checkout.
    pub preorder_enabled: bool,
    /// Text shown in the announcement bar; empty hides the bar.
    pub announcement_text: String,
    /// Name used as the sender of customer emails.
    pub sender_name: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            preorder_enabled: false,
            announcement_text: String::new(),
            sender_name: DEFAULT_SENDER_NAME.to_string(),
        }
    }
}

impl SiteSettings {
    /// Defaults with the preorder switch set from a fallback flag.
    #[must_use]
    pub fn with_preorder_fallback(preorder_enabled: bool) -> Self {
        Self {
            preorder_enabled,
            ..Self::default()
        }
    }

    /// Whether the announcement bar should show.
    #[must_use]
    pub fn has_announcement(&self) -> bool {
        !self.announcement_text.trim().is_empty()
    }
}

/// Body of `GET /api/site-settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettingsResponse {
    #[serde(default)]
    pub settings: SiteSettings,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: SiteSettings =
            serde_json::from_str(r#"{"preorderEnabled":true,"extra":1}"#).unwrap();
        assert!(settings.preorder_enabled);
        assert_eq!(settings.sender_name, "Sareine");
        assert!(!settings.has_announcement());
    }

    #[test]
    fn test_response_wire_format() {
        let body = SiteSettingsResponse {
            settings: SiteSettings {
                announcement_text: "Free shipping this week".to_string(),
                ..SiteSettings::default()
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["settings"]["preorderEnabled"], false);
        assert_eq!(json["settings"]["announcementText"], "Free shipping this week");
        assert_eq!(json["settings"]["senderName"], "Sareine");
    }
}
