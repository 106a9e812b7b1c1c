use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tickerwatch_util::Storage;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const THEME_STORAGE_KEY: &str = "app_theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

/// The persisted light/dark preference.
pub struct ThemeStore {
    storage: Arc<dyn Storage>,
    theme: Mutex<Theme>,
}

impl ThemeStore {
    /// Read the saved preference, or use `system_default` when there is none
    /// (or it can't be read).
    pub async fn load(storage: Arc<dyn Storage>, system_default: Theme) -> Self {
        let theme = match storage.get_item(THEME_STORAGE_KEY).await {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!("ignoring saved theme: {e}");
                system_default
            }),
            Ok(None) => system_default,
            Err(e) => {
                warn!("failed reading theme preference: {e:#}");
                system_default
            }
        };
        debug!("theme: {theme}");
        Self {
            storage,
            theme: Mutex::new(theme),
        }
    }

    pub async fn theme(&self) -> Theme {
        *self.theme.lock().await
    }

    /// Flip the theme and persist it. The new theme applies even when it
    /// can't be saved.
    pub async fn toggle(&self) -> Theme {
        let mut theme = self.theme.lock().await;
        *theme = theme.toggled();
        if let Err(e) = self.storage.set_item(THEME_STORAGE_KEY, theme.as_str()).await {
            warn!("failed saving theme preference: {e:#}");
        }
        *theme
    }
}
