//! Configuration validation.
//!
//! Flags unknown or misspelled keys, missing credentials and suspicious
//! values before a client is built from the file.

use std::path::{Path, PathBuf};

use {secrecy::ExposeSecret, serde_json::Value};

use crate::{
    loader::{self, parse_config},
    schema::WxmpConfig,
};

/// Documented access token lifetime. Refreshes never wait longer than the
/// provider-reported expiry, so a larger interval has no effect.
const TOKEN_LIFETIME_SECS: u64 = 7200;

const TOP_LEVEL_KEYS: &[&str] = &["wechat", "server"];
const WECHAT_KEYS: &[&str] = &[
    "app_id",
    "app_secret",
    "webhook_token",
    "api_base",
    "refresh_interval_secs",
];
const SERVER_KEYS: &[&str] = &["bind", "port", "path"];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of "syntax", "unknown-field", "type-error", "missing", "security", "value".
    pub category: &'static str,
    /// Dotted path, e.g. "wechat.app_id"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, category: &'static str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message,
        });
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

/// Validate the file at `path`, or the discovered config file when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(path) = path.map(Path::to_path_buf).or_else(loader::find_config_file) else {
        let mut result = ValidationResult::default();
        result.push(
            Severity::Info,
            "missing",
            "",
            "no config file found; using defaults".into(),
        );
        return result;
    };

    let mut result = match std::fs::read_to_string(&path) {
        Ok(raw) => validate_str(&crate::substitute_env(&raw), &path),
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            );
            result
        },
    };
    result.config_path = Some(path);
    result
}

/// Validate raw config text; `path` only selects the format.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    let value = match to_value(raw, path) {
        Ok(v) => v,
        Err(message) => {
            result.push(Severity::Error, "syntax", "", message);
            return result;
        },
    };
    check_unknown_fields(&value, &mut result);

    match parse_config(raw, path) {
        Ok(config) => result
            .diagnostics
            .extend(validate_config(&config).diagnostics),
        Err(e) => result.push(Severity::Error, "type-error", "", e.to_string()),
    }
    result
}

/// Semantic checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &WxmpConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let wechat = &config.wechat;

    if wechat.app_id.trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "wechat.app_id",
            "app_id is required".into(),
        );
    }
    if wechat.app_secret.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            "wechat.app_secret",
            "app_secret is required".into(),
        );
    }
    if wechat
        .webhook_token
        .as_ref()
        .is_none_or(|t| t.expose_secret().is_empty())
    {
        result.push(
            Severity::Warning,
            "security",
            "wechat.webhook_token",
            "webhook_token not set; every webhook callback will be rejected".into(),
        );
    }
    if !(wechat.api_base.starts_with("http://") || wechat.api_base.starts_with("https://")) {
        result.push(
            Severity::Error,
            "value",
            "wechat.api_base",
            format!("api_base must be an http(s) URL, got {:?}", wechat.api_base),
        );
    }
    if wechat.refresh_interval_secs == 0 {
        result.push(
            Severity::Error,
            "value",
            "wechat.refresh_interval_secs",
            "refresh_interval_secs must be positive".into(),
        );
    } else if wechat.refresh_interval_secs > TOKEN_LIFETIME_SECS {
        result.push(
            Severity::Info,
            "value",
            "wechat.refresh_interval_secs",
            format!(
                "refresh interval {}s exceeds the {TOKEN_LIFETIME_SECS}s token lifetime; \
                 refreshes follow the reported token expiry instead",
                wechat.refresh_interval_secs
            ),
        );
    }
    if !config.server.path.starts_with('/') {
        result.push(
            Severity::Error,
            "value",
            "server.path",
            "server.path must start with '/'".into(),
        );
    }
    if config.server.port == 0 {
        result.push(
            Severity::Info,
            "value",
            "server.port",
            "port 0 binds a random port".into(),
        );
    }
    result
}

fn to_value(raw: &str, path: &Path) -> Result<Value, String> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| format!("TOML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<serde_yaml::Value>(raw)
            .map_err(|e| format!("YAML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}")),
        other => Err(format!("unsupported config format: .{other}")),
    }
}

fn check_unknown_fields(value: &Value, result: &mut ValidationResult) {
    let Some(root) = value.as_object() else {
        // An empty YAML document parses as null.
        if !value.is_null() {
            result.push(
                Severity::Error,
                "syntax",
                "",
                "config root must be a table".into(),
            );
        }
        return;
    };
    for (key, child) in root {
        let known = match key.as_str() {
            "wechat" => WECHAT_KEYS,
            "server" => SERVER_KEYS,
            _ => {
                report_unknown(key, key, TOP_LEVEL_KEYS, result);
                continue;
            },
        };
        for field in child.as_object().into_iter().flat_map(|o| o.keys()) {
            if !known.contains(&field.as_str()) {
                report_unknown(&format!("{key}.{field}"), field, known, result);
            }
        }
    }
}

fn report_unknown(path: &str, key: &str, known: &[&str], result: &mut ValidationResult) {
    let message = match suggest(key, known, 3) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".into(),
    };
    result.push(Severity::Error, "unknown-field", path, message);
}
