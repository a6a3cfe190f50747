//! Configuration loading, validation and env substitution for `wxmp`.
//!
//! Config files: `wxmp.toml`, `wxmp.yaml`, `wxmp.yml` or `wxmp.json`,
//! searched in `./` then the user config directory (`~/.config/wxmp/`).
//!
//! Supports `${ENV_VAR}` substitution anywhere in the file, and `WXMP_*`
//! variables override the credentials after loading.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    env_subst::substitute_env,
    loader::{
        Error, Result, apply_env_overrides, config_dir, discover_and_load, find_config_file,
        load_config, parse_config,
    },
    schema::{ServerConfig, WechatConfig, WxmpConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config, validate_str},
};
