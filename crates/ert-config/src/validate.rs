//! Config validation logic.

use std::collections::HashSet;

use crate::schema::{ErtConfig, LATEST_VERSION, LocalConfigDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_config(config: &ErtConfig) -> Result<(), ValidationError> {
    if config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    if config.ensemble_size == 0 {
        return Err(invalid("ensemble_size", 0, "must be positive"));
    }

    validate_case_name("current_case", &config.current_case)?;
    if let Some(target) = &config.analysis.target_case {
        validate_case_name("analysis.target_case", target)?;
    }

    let analysis = &config.analysis;
    if analysis.min_realizations > config.ensemble_size {
        return Err(invalid(
            "analysis.min_realizations",
            analysis.min_realizations,
            "exceeds ensemble_size",
        ));
    }
    if analysis.active_module.trim().is_empty() {
        return Err(invalid("analysis.active_module", "", "must not be empty"));
    }

    let iteration = &analysis.iteration;
    if iteration.num_iterations == 0 {
        return Err(invalid("analysis.iteration.num_iterations", 0, "must be >= 1"));
    }
    if iteration.num_retries_per_iteration == 0 {
        return Err(invalid(
            "analysis.iteration.num_retries_per_iteration",
            0,
            "must be >= 1",
        ));
    }
    if iteration.case_format.matches("%d").count() != 1 {
        return Err(invalid(
            "analysis.iteration.case_format",
            &iteration.case_format,
            "must contain exactly one %d",
        ));
    }

    let mut obs_keys = HashSet::new();
    for obs in &config.observations {
        if !obs_keys.insert(obs.key.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: obs.key.clone(),
                context: "observations".to_string(),
            });
        }
    }

    let mut param_keys = HashSet::new();
    for key in &config.parameters {
        if !param_keys.insert(key.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: key.clone(),
                context: "parameters".to_string(),
            });
        }
    }

    if let Some(local) = &config.local_config {
        validate_local_config(local, &obs_keys, &param_keys)?;
    }

    Ok(())
}

fn validate_local_config(
    local: &LocalConfigDef,
    obs_keys: &HashSet<&str>,
    param_keys: &HashSet<&str>,
) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for ministep in &local.ministeps {
        if !names.insert(ministep.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: ministep.name.clone(),
                context: "local_config ministeps".to_string(),
            });
        }

        let context = format!("ministep '{}'", ministep.name);
        let mut selected = HashSet::new();
        for obs in &ministep.observations {
            if !obs_keys.contains(obs.key.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: obs.key.clone(),
                    context: format!("{context} observations"),
                });
            }
            if !selected.insert(obs.key.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: obs.key.clone(),
                    context: format!("{context} observations"),
                });
            }
            if let Some(range) = obs.range
                && range.start > range.end
            {
                return Err(invalid(
                    &format!("{context} range"),
                    format!("[{}, {}]", range.start, range.end),
                    "start after end",
                ));
            }
        }

        for key in &ministep.parameters {
            if !param_keys.contains(key.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: key.clone(),
                    context: format!("{context} parameters"),
                });
            }
        }
    }
    Ok(())
}

fn validate_case_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(invalid(field, name, "must not be empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid(field, name, "must not contain path separators"));
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
