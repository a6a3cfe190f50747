use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::WxmpConfig};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &["wxmp.toml", "wxmp.yaml", "wxmp.yml", "wxmp.json"];

/// Environment variables that override file values.
pub const ENV_APP_ID: &str = "WXMP_APP_ID";
pub const ENV_APP_SECRET: &str = "WXMP_APP_SECRET";
pub const ENV_WEBHOOK_TOKEN: &str = "WXMP_WEBHOOK_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<WxmpConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./wxmp.{toml,yaml,yml,json}`
/// 2. `<user config dir>/wxmp/wxmp.{toml,yaml,yml,json}`
///
/// Returns the default config if no file is found or it fails to load.
pub fn discover_and_load() -> WxmpConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    WxmpConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    find_config_file_in(&dirs)
}

fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/wxmp/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "wxmp").map(|d| d.config_dir().to_path_buf())
}

/// Apply `WXMP_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut WxmpConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut WxmpConfig, lookup: impl Fn(&str) -> Option<String>) {
    let set = |name: &str| lookup(name).filter(|v| !v.is_empty());
    if let Some(app_id) = set(ENV_APP_ID) {
        config.wechat.app_id = app_id;
    }
    if let Some(secret) = set(ENV_APP_SECRET) {
        config.wechat.app_secret = Secret::new(secret);
    }
    if let Some(token) = set(ENV_WEBHOOK_TOKEN) {
        config.wechat.webhook_token = Some(Secret::new(token));
    }
}

/// Parse `raw` in the format implied by `path`'s extension (TOML if none).
pub fn parse_config(raw: &str, path: &Path) -> Result<WxmpConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("wxmp.toml", "[wechat]\napp_id = \"wx1\"\napp_secret = \"s\"\n"),
            ("wxmp.yaml", "wechat:\n  app_id: wx1\n  app_secret: s\n"),
            ("wxmp.json", r#"{"wechat":{"app_id":"wx1","app_secret":"s"}}"#),
        ];
        for (name, body) in files {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            let cfg = load_config(&path).unwrap();
            assert_eq!(cfg.wechat.app_id, "wx1", "{name}");
            assert_eq!(cfg.wechat.app_secret.expose_secret(), "s", "{name}");
        }
    }

    #[test]
    fn unsupported_extension() {
        let err = parse_config("", Path::new("wxmp.ini")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == "ini"));
    }

    #[test]
    fn parse_error_names_file() {
        let err = parse_config("[wechat", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn finds_first_existing_in_order() {
        let local = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        std::fs::write(global.path().join("wxmp.toml"), "").unwrap();
        let dirs = [local.path().to_path_buf(), global.path().to_path_buf()];
        assert_eq!(
            find_config_file_in(&dirs),
            Some(global.path().join("wxmp.toml"))
        );

        std::fs::write(local.path().join("wxmp.yaml"), "").unwrap();
        assert_eq!(
            find_config_file_in(&dirs),
            Some(local.path().join("wxmp.yaml"))
        );
    }

    #[test]
    fn env_overrides_replace_non_empty_values() {
        let mut cfg = WxmpConfig::default();
        cfg.wechat.app_id = "from-file".into();
        apply_env_overrides_with(&mut cfg, |name| match name {
            ENV_APP_SECRET => Some("env-secret".into()),
            ENV_WEBHOOK_TOKEN => Some("env-hook".into()),
            ENV_APP_ID => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.wechat.app_id, "from-file");
        assert_eq!(cfg.wechat.app_secret.expose_secret(), "env-secret");
        assert_eq!(
            cfg.wechat.webhook_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("env-hook")
        );
    }
}
