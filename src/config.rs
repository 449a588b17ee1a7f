//! Runtime configuration from the environment (and an optional `.env`).
//!
//! | Variable                    | Default                          |
//! |-----------------------------|----------------------------------|
//! | `LIQUID_GLASS_DATA_DIR`     | `<config dir>/liquid-glass`      |
//! | `LIQUID_GLASS_DOWNLOAD_DIR` | platform download dir, else `.`  |
//! | `LIQUID_GLASS_WALLPAPERS`   | none (comma-separated URLs)      |

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Wallpaper swatches offered in the popup.
    pub wallpapers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: crate::storage::default_data_dir(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            wallpapers: Vec::new(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("[CONFIG] Ignoring unreadable .env: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("LIQUID_GLASS_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(dir) = lookup("LIQUID_GLASS_DOWNLOAD_DIR").filter(|v| !v.trim().is_empty()) {
            config.download_dir = PathBuf::from(dir.trim());
        }
        if let Some(list) = lookup("LIQUID_GLASS_WALLPAPERS") {
            config.wallpapers = parse_wallpaper_list(&list);
        }

        log::debug!("[CONFIG] {:?}", config);
        config
    }
}

/// Comma-separated http(s) URLs; blanks and other schemes are dropped.
fn parse_wallpaper_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|url| {
            let ok = url.starts_with("http://") || url.starts_with("https://");
            if !ok && !url.is_empty() {
                log::warn!("[CONFIG] Skipping wallpaper {:?}: not an http(s) URL", url);
            }
            ok
        })
        .map(str::to_string)
        .collect()
}
