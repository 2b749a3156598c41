//! TOML configuration of a CLIFF run
//!
//! Every section and field is optional; missing values take the defaults
//! below. Unknown keys are rejected so typos do not silently fall back to
//! defaults.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cell::{Cell, CellError};
use crate::components::TangToenniesParams;
use crate::ml::{Kernel, KrrParams, MlMethod};
use crate::properties::PropertySource;

/// Errors that can occur when loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<CellError> for ConfigError {
    fn from(e: CellError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// Full run configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub cell: CellOptions,
    pub hirshfeld: PropertyOptions,
    pub valence_width: PropertyOptions,
    pub dispersion: DispersionOptions,
    pub ml: MlOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CellOptions {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for CellOptions {
    fn default() -> Self {
        Self {
            a: 100.0,
            b: 100.0,
            c: 100.0,
        }
    }
}

/// Settings of one learned atomic property
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyOptions {
    pub source: PropertySource,
    /// Trained model artifact (JSON)
    pub model: Option<PathBuf>,
    pub max_neighbors: usize,
    pub method: MlMethod,
    pub kernel: Kernel,
    pub sigma: f64,
    pub lambda: f64,
    /// Directory of precomputed values, one file per monomer
    pub cache_dir: Option<PathBuf>,
}

impl Default for PropertyOptions {
    fn default() -> Self {
        let krr = KrrParams::default();
        Self {
            source: PropertySource::Model,
            model: None,
            max_neighbors: 12,
            method: MlMethod::Krr,
            kernel: krr.kernel,
            sigma: krr.sigma,
            lambda: krr.lambda,
            cache_dir: None,
        }
    }
}

impl PropertyOptions {
    pub fn krr_params(&self) -> KrrParams {
        KrrParams {
            kernel: self.kernel,
            sigma: self.sigma,
            lambda: self.lambda,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DispersionMethod {
    #[default]
    #[serde(rename = "tang-toennies", alias = "TT")]
    TangToennies,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispersionOptions {
    pub method: DispersionMethod,
    /// Per-atom-type overrides of the C8/C10 scale factors
    pub scale: HashMap<String, f64>,
}

impl DispersionOptions {
    pub fn params(&self) -> TangToenniesParams {
        TangToenniesParams::with_overrides(&self.scale)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MlOptions {
    /// Kernel matrices above this size (GB) are reported as warnings
    pub memory_warning_gb: f64,
}

impl Default for MlOptions {
    fn default() -> Self {
        Self {
            memory_warning_gb: 4.0,
        }
    }
}

impl Options {
    /// Read a configuration file. Relative model and cache paths are taken
    /// relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut options: Options = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        if let Some(base) = path.parent() {
            options.resolve_paths(base);
        }
        options.validate()?;
        Ok(options)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: Options = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            source: e,
        })?;
        options.validate()?;
        Ok(options)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for property in [&mut self.hirshfeld, &mut self.valence_width] {
            for path in [&mut property.model, &mut property.cache_dir].into_iter().flatten() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cell()?;
        for (name, property) in [("hirshfeld", &self.hirshfeld), ("valence_width", &self.valence_width)] {
            if property.max_neighbors == 0 {
                return Err(ConfigError::Invalid(format!(
                    "[{}] max_neighbors must be at least 1",
                    name
                )));
            }
            property
                .krr_params()
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("[{}] {}", name, e)))?;
        }
        if self.ml.memory_warning_gb.is_nan() || self.ml.memory_warning_gb < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "[ml] memory_warning_gb must be non-negative, got {}",
                self.ml.memory_warning_gb
            )));
        }
        Ok(())
    }

    pub fn cell(&self) -> Result<Cell, ConfigError> {
        Ok(Cell::lattice_parameters(self.cell.a, self.cell.b, self.cell.c)?)
    }
}
