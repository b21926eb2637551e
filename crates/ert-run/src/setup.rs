//! Builds observation catalogs and local configuration from a run config.

use ert_config::ErtConfig;
use ert_obs::{LocalConfig, Observations, ParameterKeys};
use tracing::debug;

use crate::RunResult;

pub fn observations_from_config(config: &ErtConfig) -> Observations {
    let mut observations = Observations::new();
    for obs in &config.observations {
        observations.insert(obs.key.clone(), obs.steps.iter().copied());
    }
    observations
}

pub fn parameters_from_config(config: &ErtConfig) -> ParameterKeys {
    config.parameters.iter().cloned().collect()
}

/// Local configuration described by `config.local_config`, or the default
/// ALL_ACTIVE setup when the section is absent.
///
/// Each ministep gets an obsdata and a dataset of the same name.
pub fn build_local_config<'o>(
    config: &ErtConfig,
    observations: &'o Observations,
    parameters: &'o ParameterKeys,
) -> RunResult<LocalConfig<'o>> {
    let Some(local) = &config.local_config else {
        return Ok(LocalConfig::all_active(observations, parameters)?);
    };

    let mut local_config = LocalConfig::new(observations, parameters);
    for ministep in &local.ministeps {
        let obsdata = local_config.create_obsdata(&ministep.name)?;
        for obs in &ministep.observations {
            match obs.range {
                Some(range) => {
                    obsdata.add_node_and_range(&obs.key, range.start, range.end)?;
                }
                None => {
                    obsdata.add_node(&obs.key, true)?;
                }
            }
        }

        let dataset = local_config.create_dataset(&ministep.name)?;
        for key in &ministep.parameters {
            dataset.add_node(key)?;
        }

        local_config.create_ministep(&ministep.name)?;
        local_config.attach_obsdata(&ministep.name, &ministep.name)?;
        local_config.attach_dataset(&ministep.name, &ministep.name)?;
        local_config.attach_ministep(&ministep.name)?;
        debug!(
            ministep = %ministep.name,
            observations = ministep.observations.len(),
            parameters = ministep.parameters.len(),
            "Configured ministep"
        );
    }
    Ok(local_config)
}
