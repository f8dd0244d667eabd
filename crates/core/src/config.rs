use crate::error::{AppError, Result};
use crate::settings::Settings;
use crate::sink::ClientCredential;
use crate::ui::OverlayStyle;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Resolved runtime configuration.
///
/// Environment variables win over the persisted [`Settings`].
#[derive(Clone, Debug)]
pub struct Config {
    pub client_id: Option<ClientCredential>,
    pub hotkey: String,
    pub save_dir: Option<PathBuf>,
    pub copy_to_clipboard: bool,
    pub share_enabled: bool,
    pub overlay: OverlayStyle,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        Self::from_sources(Settings::load(), |key| env::var(key).ok())
    }

    /// Layers environment lookups over `settings`.
    pub fn from_sources(settings: Settings, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let mut builder = Config::builder()
            .with_hotkey(non_empty("SHARESHOT_HOTKEY").unwrap_or(settings.hotkey))
            .with_clipboard(settings.copy_to_clipboard)
            .with_share(settings.share_enabled)
            .with_overlay(settings.overlay);

        if let Some(id) = non_empty("SHARESHOT_CLIENT_ID").or(settings.client_id) {
            builder = builder.with_client_id(id);
        }
        if let Some(dir) = non_empty("SHARESHOT_SAVE_DIR")
            .map(PathBuf::from)
            .or(settings.save_dir)
        {
            builder = builder.with_save_dir(dir);
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`], used for CLI overrides and tests.
#[derive(Debug)]
pub struct ConfigBuilder {
    client_id: Option<String>,
    hotkey: String,
    save_dir: Option<PathBuf>,
    copy_to_clipboard: bool,
    share_enabled: bool,
    overlay: OverlayStyle,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        let defaults = Settings::default();
        Self {
            client_id: None,
            hotkey: defaults.hotkey,
            save_dir: None,
            copy_to_clipboard: defaults.copy_to_clipboard,
            share_enabled: defaults.share_enabled,
            overlay: defaults.overlay,
        }
    }
}

impl ConfigBuilder {
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = hotkey.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    pub fn with_clipboard(mut self, enabled: bool) -> Self {
        self.copy_to_clipboard = enabled;
        self
    }

    pub fn with_share(mut self, enabled: bool) -> Self {
        self.share_enabled = enabled;
        self
    }

    pub fn with_overlay(mut self, overlay: OverlayStyle) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.hotkey.trim().is_empty() {
            return Err(AppError::config("hotkey must not be empty"));
        }

        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .map(ClientCredential::new);

        if self.share_enabled && client_id.is_none() {
            return Err(AppError::config(
                "sharing is enabled but no client id is set (SHARESHOT_CLIENT_ID)",
            ));
        }

        Ok(Config {
            client_id,
            hotkey: self.hotkey,
            save_dir: self.save_dir,
            copy_to_clipboard: self.copy_to_clipboard,
            share_enabled: self.share_enabled,
            overlay: self.overlay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_overrides_settings() {
        let settings = Settings {
            client_id: Some("from-file".into()),
            hotkey: "Ctrl+F10".into(),
            ..Settings::default()
        };
        let config = Config::from_sources(
            settings,
            env_from(&[
                ("SHARESHOT_CLIENT_ID", "from-env"),
                ("SHARESHOT_SAVE_DIR", "/tmp/shots"),
            ]),
        )
        .unwrap();

        assert_eq!(config.client_id.unwrap().expose(), "from-env");
        assert_eq!(config.hotkey, "Ctrl+F10");
        assert_eq!(config.save_dir, Some(PathBuf::from("/tmp/shots")));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config =
            Config::from_sources(Settings::default(), env_from(&[("SHARESHOT_HOTKEY", "  ")]))
                .unwrap();
        assert_eq!(config.hotkey, "Ctrl+F9");
        assert!(config.client_id.is_none());
    }

    #[test]
    fn sharing_requires_client_id() {
        let err = Config::builder().with_share(true).build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let config = Config::builder()
            .with_share(true)
            .with_client_id("abc")
            .build()
            .unwrap();
        assert!(config.share_enabled);
    }

    #[test]
    fn empty_hotkey_is_rejected() {
        assert!(Config::builder().with_hotkey("").build().is_err());
    }
}
