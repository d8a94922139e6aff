// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{EncarunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::EncarunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.controller, raw.run))
    }
}

/// Structural checks that need nothing but the parsed TOML.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_controller(cfg)?;
    validate_run(cfg)?;
    Ok(())
}

fn validate_controller(cfg: &RawConfigFile) -> Result<()> {
    let controller = &cfg.controller;

    if controller.executable.trim().is_empty() {
        return Err(EncarunError::ConfigError(
            "[controller].executable must not be empty".to_string(),
        ));
    }

    if controller.accounts.is_empty() {
        return Err(EncarunError::ConfigError(
            "[controller].accounts must list at least one account".to_string(),
        ));
    }

    for key in controller.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(EncarunError::ConfigError(format!(
                "[controller.env] has invalid variable name '{key}'"
            )));
        }
    }

    if let Some(name) = &controller.log_file_name {
        if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
            return Err(EncarunError::ConfigError(format!(
                "[controller].log_file_name must be a plain file name (got '{name}')"
            )));
        }
    }

    Ok(())
}

fn validate_run(cfg: &RawConfigFile) -> Result<()> {
    let run = &cfg.run;

    if run.account.trim().is_empty() {
        return Err(EncarunError::ConfigError(
            "[run].account must not be empty".to_string(),
        ));
    }

    if run.output_dir.as_os_str().is_empty() {
        return Err(EncarunError::ConfigError(
            "[run].output_dir must not be empty".to_string(),
        ));
    }

    for name in run.inputs.keys().chain(run.parameters.keys()) {
        if name.trim().is_empty() || name.contains('=') {
            return Err(EncarunError::ConfigError(format!(
                "[run] input/parameter name '{name}' is not usable on the command line"
            )));
        }
    }

    Ok(())
}
