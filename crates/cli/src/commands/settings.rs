//! Site settings commands.
//!
//! # Usage
//!
//! ```bash
//! sareine settings show
//! sareine settings set --preorder true --announcement "Free shipping over ₹999"
//! ```

use sareine_core::SiteSettings;
use sareine_storefront::db::SiteSettingsRepository;

use super::{CommandError, connect};

/// Fields to change; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub preorder_enabled: Option<bool>,
    pub announcement_text: Option<String>,
    pub sender_name: Option<String>,
}

impl SettingsUpdate {
    fn apply(self, settings: &mut SiteSettings) {
        if let Some(enabled) = self.preorder_enabled {
            settings.preorder_enabled = enabled;
        }
        if let Some(text) = self.announcement_text {
            settings.announcement_text = text;
        }
        if let Some(name) = self.sender_name {
            settings.sender_name = name;
        }
    }
}

/// Print the stored settings, or the defaults if none are stored.
pub async fn show() -> Result<(), CommandError> {
    let pool = connect().await?;
    let settings = SiteSettingsRepository::new(&pool)
        .get()
        .await?
        .unwrap_or_default();

    #[allow(clippy::print_stdout)]
    {
        println!("preorder enabled:  {}", settings.preorder_enabled);
        println!("announcement:      {:?}", settings.announcement_text);
        println!("sender name:       {}", settings.sender_name);
    }
    Ok(())
}

/// Change the given settings fields. Open storefronts pick the change up on
/// their next poll.
pub async fn set(update: SettingsUpdate) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = SiteSettingsRepository::new(&pool);

    let mut settings = repo.get().await?.unwrap_or_default();
    update.apply(&mut settings);
    repo.upsert(&settings).await?;

    tracing::info!(
        preorder_enabled = settings.preorder_enabled,
        "Site settings updated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_changes_only_given_fields() {
        let mut settings = SiteSettings {
            announcement_text: "Hello".to_string(),
            ..SiteSettings::default()
        };

        SettingsUpdate {
            preorder_enabled: Some(true),
            ..SettingsUpdate::default()
        }
        .apply(&mut settings);

        assert!(settings.preorder_enabled);
        assert_eq!(settings.announcement_text, "Hello");
        assert_eq!(settings.sender_name, "Sareine");
    }
}
