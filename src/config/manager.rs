use super::{evolution::EvolutionConfig, search_space::SearchSpaceConfig, traits::ConfigSection};
use crate::error::TypedGpError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Prefix of environment overrides, e.g. `TYPEDGP__EVOLUTION__MAX_SIZE=30`.
pub const ENV_PREFIX: &str = "TYPEDGP";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub evolution: EvolutionConfig,
    pub search_space: SearchSpaceConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), TypedGpError> {
        self.evolution.validate()?;
        self.search_space.validate()?;
        Ok(())
    }

    /// Defaults, then the optional TOML file, then environment overrides.
    pub fn load_layered<P: AsRef<Path>>(path: Option<P>) -> Result<Self, TypedGpError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&EngineConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path.as_ref()));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        log::debug!(
            "Loaded {} and {} sections",
            EvolutionConfig::section_name(),
            SearchSpaceConfig::section_name()
        );
        Ok(config)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<EngineConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(EngineConfig::default())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineConfig>, TypedGpError> {
        self.config
            .read()
            .map_err(|_| TypedGpError::Configuration("Config lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineConfig>, TypedGpError> {
        self.config
            .write()
            .map_err(|_| TypedGpError::Configuration("Config lock poisoned".to_string()))
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TypedGpError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TypedGpError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: EngineConfig = toml::from_str(&contents)?;
        config.validate()?;

        *self.write()? = config;
        Ok(())
    }

    pub fn load_layered<P: AsRef<Path>>(&self, path: Option<P>) -> Result<(), TypedGpError> {
        let config = EngineConfig::load_layered(path)?;
        *self.write()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TypedGpError> {
        let toml_str = toml::to_string_pretty(&*self.read()?)?;

        std::fs::write(path, toml_str)
            .map_err(|e| TypedGpError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<EngineConfig, TypedGpError> {
        Ok(self.read()?.clone())
    }

    /// Applies `f` and keeps the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<(), TypedGpError>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut config = self.write()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
