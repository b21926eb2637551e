//! Case storage API.
//!
//! Layout: `<root>/<case>/state_map.json` and `<root>/<case>/case_config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use ert_core::ActiveRealizationMask;
use ert_state::StateMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{Case, CaseConfig, InitSource};
use crate::{FsError, FsResult};

const STATE_MAP_FILE: &str = "state_map.json";
const CASE_CONFIG_FILE: &str = "case_config.json";

#[derive(Debug, Clone, Copy)]
enum SeedMode {
    FillUndefined,
    Reset,
}

#[derive(Debug, Clone)]
pub struct CaseStore {
    root_dir: PathBuf,
}

impl CaseStore {
    pub fn new(root_dir: PathBuf) -> FsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir).map_err(|source| io_err(&root_dir, source))?;
        }
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn case_dir(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    pub fn has_case(&self, name: &str) -> bool {
        self.case_dir(name).is_dir()
    }

    /// Open `name`, creating an empty case when `create` is set.
    pub fn mount(&self, name: &str, create: bool) -> FsResult<Case> {
        validate_case_name(name)?;
        if self.has_case(name) {
            return Ok(Case::new(name));
        }
        if !create {
            return Err(FsError::CaseNotFound {
                case: name.to_string(),
            });
        }

        let dir = self.case_dir(name);
        fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;
        write_json(&dir.join(CASE_CONFIG_FILE), &CaseConfig::default())?;
        StateMap::new().save(&dir.join(STATE_MAP_FILE))?;
        Ok(Case::new(name))
    }

    /// Case names in ascending order.
    pub fn list_cases(&self) -> FsResult<Vec<String>> {
        let mut cases = Vec::new();
        if !self.root_dir.exists() {
            return Ok(cases);
        }

        let entries = fs::read_dir(&self.root_dir).map_err(|source| io_err(&self.root_dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_err(&self.root_dir, source))?;
            if entry.path().is_dir() {
                cases.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        cases.sort();
        Ok(cases)
    }

    pub fn delete_case(&self, name: &str) -> FsResult<()> {
        validate_case_name(name)?;
        let dir = self.case_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| io_err(&dir, source))?;
        }
        Ok(())
    }

    /// State map of `name`; an absent file yields an empty map.
    pub fn load_state_map(&self, name: &str) -> FsResult<StateMap> {
        let path = self.existing_case(name)?.join(STATE_MAP_FILE);
        if !path.exists() {
            return Ok(StateMap::new());
        }
        Ok(StateMap::load(&path)?)
    }

    pub fn load_read_only_state_map(&self, name: &str) -> FsResult<StateMap> {
        let path = self.existing_case(name)?.join(STATE_MAP_FILE);
        if !path.exists() {
            let mut map = StateMap::new();
            map.mark_read_only();
            return Ok(map);
        }
        Ok(StateMap::load_read_only(&path)?)
    }

    pub fn save_state_map(&self, name: &str, map: &StateMap) -> FsResult<()> {
        let path = self.existing_case(name)?.join(STATE_MAP_FILE);
        map.save(&path)?;
        Ok(())
    }

    /// Case metadata; defaults when the file is absent.
    pub fn case_config(&self, name: &str) -> FsResult<CaseConfig> {
        let path = self.existing_case(name)?.join(CASE_CONFIG_FILE);
        if !path.exists() {
            return Ok(CaseConfig::default());
        }
        read_json(&path)
    }

    pub fn set_iteration_number(&self, name: &str, iteration: usize) -> FsResult<()> {
        let mut config = self.case_config(name)?;
        config.iteration_number = iteration;
        write_json(&self.case_dir(name).join(CASE_CONFIG_FILE), &config)
    }

    /// Seed `target` from `source` for the active realizations of `mask`.
    ///
    /// Realizations that are `Initialized` or `HasData` in the source become
    /// `Initialized` in the target when still undefined there. Returns the
    /// number of realizations initialized.
    pub fn init_case_from_existing(
        &self,
        source: &str,
        target: &str,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> FsResult<usize> {
        self.seed_case(source, target, report_step, mask, SeedMode::FillUndefined)
    }

    /// Like [`CaseStore::init_case_from_existing`], but every state already
    /// stored in `target` is discarded first.
    pub fn reset_case_from_existing(
        &self,
        source: &str,
        target: &str,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> FsResult<usize> {
        self.seed_case(source, target, report_step, mask, SeedMode::Reset)
    }

    fn seed_case(
        &self,
        source: &str,
        target: &str,
        report_step: usize,
        mask: &ActiveRealizationMask,
        mode: SeedMode,
    ) -> FsResult<usize> {
        let source_map = self.load_read_only_state_map(source)?;
        self.mount(target, true)?;
        let mut target_map = self.load_state_map(target)?;

        let initialized = match mode {
            SeedMode::FillUndefined => target_map.initialize_from(&source_map, mask)?,
            SeedMode::Reset => target_map.reinitialize_from(&source_map, mask)?,
        };
        self.save_state_map(target, &target_map)?;

        let mut config = self.case_config(target)?;
        config.initialized_from = Some(InitSource {
            case: source.to_string(),
            report_step,
        });
        write_json(&self.case_dir(target).join(CASE_CONFIG_FILE), &config)?;
        Ok(initialized)
    }

    fn existing_case(&self, name: &str) -> FsResult<PathBuf> {
        validate_case_name(name)?;
        let dir = self.case_dir(name);
        if !dir.is_dir() {
            return Err(FsError::CaseNotFound {
                case: name.to_string(),
            });
        }
        Ok(dir)
    }
}

fn validate_case_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FsError::InvalidCaseName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> FsResult<T> {
    let content = fs::read_to_string(path).map_err(|source| io_err(path, source))?;
    serde_json::from_str(&content).map_err(|source| FsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> FsResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| FsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| io_err(path, source))
}

fn io_err(path: &Path, source: std::io::Error) -> FsError {
    FsError::Io {
        path: path.to_path_buf(),
        source,
    }
}
