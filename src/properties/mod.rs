//! Learned per-atom properties: Hirshfeld ratios and valence widths
//!
//! Both properties follow the same recipe: one Coulomb-matrix descriptor per
//! atom, a kernel ridge regression trained on reference values, and a
//! prediction per atom of each new monomer.

pub mod cache;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::constants::{self, ConstantsError};
use crate::descriptor::{CoulombMatrix, DescriptorError};
use crate::logging::{facade, Logger};
use crate::ml::{KernelRidge, KrrModel, KrrParams, MlError, TrainingSet};
use crate::molecule::{Monomer, MoleculeError};

pub use cache::{CacheError, DirectoryCache, PropertyCache};

/// Errors that can occur when training or predicting atomic properties
#[derive(Error, Debug)]
pub enum PropertyError {
    #[error("Monomer {0} has no reference values to train on")]
    MissingReference(String),

    #[error("Cached {property} for {monomer} has {found} values, expected {expected}")]
    CacheLength {
        property: AtomicProperty,
        monomer: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "{property} model expects descriptors of length {model_len}, but max_neighbors = {configured} gives length {configured_len}"
    )]
    NeighborCountMismatch {
        property: AtomicProperty,
        model_len: usize,
        configured: usize,
        configured_len: usize,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Ml(#[from] MlError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),

    #[error(transparent)]
    Constants(#[from] ConstantsError),
}

/// Which per-atom property a predictor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicProperty {
    HirshfeldRatio,
    ValenceWidth,
}

impl AtomicProperty {
    /// Suffix of cache files holding this property
    pub fn cache_suffix(&self) -> &'static str {
        match self {
            AtomicProperty::HirshfeldRatio => "h",
            AtomicProperty::ValenceWidth => "vw",
        }
    }

    fn log_target(&self) -> &'static str {
        match self {
            AtomicProperty::HirshfeldRatio => "cliff::hirshfeld",
            AtomicProperty::ValenceWidth => "cliff::valence_width",
        }
    }
}

impl fmt::Display for AtomicProperty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtomicProperty::HirshfeldRatio => write!(f, "Hirshfeld ratios"),
            AtomicProperty::ValenceWidth => write!(f, "valence widths"),
        }
    }
}

/// Where predicted values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertySource {
    /// Kernel ridge regression model
    #[default]
    Model,
    /// Free-atom values: Hirshfeld ratio 1, tabulated valence widths
    FreeAtom,
}

/// Predicts one atomic property for whole monomers
pub struct PropertyPredictor {
    property: AtomicProperty,
    source: PropertySource,
    descriptor: CoulombMatrix,
    regressor: KernelRidge,
    training: TrainingSet,
    cache: Option<Box<dyn PropertyCache>>,
    logger: Arc<dyn Logger>,
}

impl PropertyPredictor {
    pub fn new(property: AtomicProperty, max_neighbors: usize) -> Self {
        let logger = facade(property.log_target());
        Self {
            property,
            source: PropertySource::Model,
            descriptor: CoulombMatrix::new(max_neighbors),
            regressor: KernelRidge::new().with_logger(logger.clone()),
            training: TrainingSet::new(),
            cache: None,
            logger,
        }
    }

    pub fn with_source(mut self, source: PropertySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_cache(mut self, cache: Box<dyn PropertyCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.regressor = std::mem::take(&mut self.regressor).with_logger(logger.clone());
        self.logger = logger;
        self
    }

    pub fn with_memory_warning(mut self, gigabytes: f64) -> Self {
        self.regressor = std::mem::take(&mut self.regressor).with_memory_warning(gigabytes);
        self
    }

    pub fn with_model(mut self, model: KrrModel) -> Self {
        self.regressor = std::mem::take(&mut self.regressor).with_model(model);
        self
    }

    pub fn property(&self) -> AtomicProperty {
        self.property
    }

    pub fn source(&self) -> PropertySource {
        self.source
    }

    pub fn max_neighbors(&self) -> usize {
        self.descriptor.max_neighbors
    }

    pub fn training_set(&self) -> &TrainingSet {
        &self.training
    }

    pub fn model(&self) -> Option<&KrrModel> {
        self.regressor.model()
    }

    /// Add every atom of `monomer` to the training set, with its reference
    /// values as targets
    pub fn add_monomer_to_training(&mut self, monomer: &Monomer) -> Result<(), PropertyError> {
        let targets = monomer
            .reference()
            .ok_or_else(|| PropertyError::MissingReference(monomer.name.clone()))?
            .to_vec();
        let descriptors = self.descriptor.describe_monomer(monomer)?;
        self.training.add(descriptors, targets)?;
        self.logger.info(format_args!(
            "Added {} to the {} training set ({} atoms total)",
            monomer.name,
            self.property,
            self.training.len()
        ));
        Ok(())
    }

    pub fn train(&mut self, params: &KrrParams) -> Result<(), PropertyError> {
        self.regressor.train(&self.training, params)?;
        Ok(())
    }

    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PropertyError> {
        self.logger.info(format_args!(
            "Reading {} model from {}",
            self.property,
            path.as_ref().display()
        ));
        let model = KrrModel::load(path)?;
        if model.descriptor_len() != self.descriptor.len() {
            return Err(PropertyError::NeighborCountMismatch {
                property: self.property,
                model_len: model.descriptor_len(),
                configured: self.descriptor.max_neighbors,
                configured_len: self.descriptor.len(),
            });
        }
        self.regressor = std::mem::take(&mut self.regressor).with_model(model);
        Ok(())
    }

    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), PropertyError> {
        self.regressor.save(path)?;
        Ok(())
    }

    /// One predicted value per atom of `monomer`. Precomputed values in the
    /// attached cache take precedence; the cache itself is never written.
    pub fn predict_monomer(&self, monomer: &Monomer) -> Result<Vec<f64>, PropertyError> {
        if self.source == PropertySource::FreeAtom {
            return self.free_atom_values(monomer);
        }

        if let Some(cache) = &self.cache {
            if cache.has_cached(&monomer.name) {
                let values = cache.load(&monomer.name)?;
                if values.len() != monomer.num_atoms() {
                    return Err(PropertyError::CacheLength {
                        property: self.property,
                        monomer: monomer.name.clone(),
                        expected: monomer.num_atoms(),
                        found: values.len(),
                    });
                }
                self.logger.debug(format_args!(
                    "Using cached {} for {}",
                    self.property, monomer.name
                ));
                return Ok(values);
            }
        }

        let start = Instant::now();
        let descriptors = self.descriptor.describe_monomer(monomer)?;
        let values = self.regressor.predict(&descriptors)?;
        self.logger.debug(format_args!(
            "Predicted {} for {} in {:?}: {:?}",
            self.property,
            monomer.name,
            start.elapsed(),
            values
        ));

        Ok(values)
    }

    /// Predict and store the property on the monomer
    pub fn annotate(&self, monomer: &mut Monomer) -> Result<(), PropertyError> {
        let values = self.predict_monomer(monomer)?;
        match self.property {
            AtomicProperty::HirshfeldRatio => monomer.set_hirshfeld_ratios(values)?,
            AtomicProperty::ValenceWidth => monomer.set_valence_widths(values)?,
        }
        Ok(())
    }

    fn free_atom_values(&self, monomer: &Monomer) -> Result<Vec<f64>, PropertyError> {
        match self.property {
            AtomicProperty::HirshfeldRatio => Ok(vec![1.0; monomer.num_atoms()]),
            AtomicProperty::ValenceWidth => monomer
                .elements()
                .map(|e| constants::free_valence_width(e).map_err(PropertyError::from))
                .collect(),
        }
    }
}
