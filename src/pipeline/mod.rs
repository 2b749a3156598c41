//! Orchestrates a full interaction-energy evaluation for monomer pairs

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cell::Cell;
use crate::components::{
    ComponentError, ComponentKind, EnergyComponent, EnergyDecomposition, TangToennies,
};
use crate::config::{ConfigError, Options, PropertyOptions};
use crate::logging::{facade, Logger};
use crate::molecule::{Monomer, MoleculeError};
use crate::properties::{
    AtomicProperty, DirectoryCache, PropertyError, PropertyPredictor, PropertySource,
};

/// Errors that can occur while evaluating a dimer
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Exactly two monomers are required, got {0}")]
    MonomerCount(usize),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

/// Total of each energy component in kcal/mol
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentEnergies {
    pub electrostatics: f64,
    pub exchange: f64,
    pub induction: f64,
    pub dispersion: f64,
}

impl ComponentEnergies {
    pub fn get(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::Electrostatics => self.electrostatics,
            ComponentKind::Exchange => self.exchange,
            ComponentKind::Induction => self.induction,
            ComponentKind::Dispersion => self.dispersion,
        }
    }

    fn add(&mut self, kind: ComponentKind, value: f64) {
        match kind {
            ComponentKind::Electrostatics => self.electrostatics += value,
            ComponentKind::Exchange => self.exchange += value,
            ComponentKind::Induction => self.induction += value,
            ComponentKind::Dispersion => self.dispersion += value,
        }
    }

    /// In report column order
    pub fn as_array(&self) -> [f64; 4] {
        ComponentKind::ALL.map(|kind| self.get(kind))
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Wall time spent in each stage of one evaluation
#[derive(Debug, Clone, Default)]
pub struct Timings {
    pub properties: Duration,
    pub components: [Duration; 4],
}

/// Energies of one dimer
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResult {
    pub mon_a: String,
    pub mon_b: String,
    pub energies: ComponentEnergies,
    pub total: f64,
    #[serde(skip)]
    decompositions: Vec<EnergyDecomposition>,
    #[serde(skip)]
    pub timings: Timings,
}

impl InteractionResult {
    /// Atom-pair matrix of one component; zero when no component of that
    /// kind is registered
    pub fn matrix(&self, kind: ComponentKind) -> &DMatrix<f64> {
        &self.decompositions[kind.index()].matrix
    }

    pub fn shape(&self) -> (usize, usize) {
        self.decompositions[0].matrix.shape()
    }

    /// Sum over components, per atom pair
    pub fn total_matrix(&self) -> DMatrix<f64> {
        let (na, nb) = self.shape();
        self.decompositions
            .iter()
            .fold(DMatrix::zeros(na, nb), |acc, d| acc + &d.matrix)
    }
}

/// Predicts atomic properties and evaluates every energy component for
/// pairs of monomers
pub struct InteractionCalculator {
    hirshfeld: PropertyPredictor,
    valence_width: PropertyPredictor,
    components: Vec<Box<dyn EnergyComponent>>,
    cell: Cell,
    logger: Arc<dyn Logger>,
}

impl InteractionCalculator {
    /// Calculator with Tang-Toennies dispersion as its only component
    pub fn new(hirshfeld: PropertyPredictor, valence_width: PropertyPredictor, cell: Cell) -> Self {
        Self {
            hirshfeld,
            valence_width,
            components: vec![Box::new(TangToennies::default())],
            cell,
            logger: facade("cliff::pipeline"),
        }
    }

    /// Build predictors, components and cell from a configuration
    pub fn from_options(options: &Options) -> Result<Self, PipelineError> {
        let memory = options.ml.memory_warning_gb;
        let hirshfeld =
            build_predictor(AtomicProperty::HirshfeldRatio, &options.hirshfeld, memory)?;
        let valence_width =
            build_predictor(AtomicProperty::ValenceWidth, &options.valence_width, memory)?;
        let dispersion = TangToennies::new(options.dispersion.params());

        Ok(Self::new(hirshfeld, valence_width, options.cell()?)
            .with_components(vec![Box::new(dispersion)]))
    }

    /// Register another component, e.g. an external electrostatics model
    pub fn with_component(mut self, component: Box<dyn EnergyComponent>) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_components(mut self, components: Vec<Box<dyn EnergyComponent>>) -> Self {
        self.components = components;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    /// Evaluate a list that must hold exactly two monomers
    pub fn evaluate_monomers(&self, monomers: &[Monomer]) -> Result<InteractionResult, PipelineError> {
        match monomers {
            [a, b] => self.evaluate(a, b),
            _ => Err(PipelineError::MonomerCount(monomers.len())),
        }
    }

    /// Interaction energy between `mon_a` and `mon_b`
    pub fn evaluate(&self, mon_a: &Monomer, mon_b: &Monomer) -> Result<InteractionResult, PipelineError> {
        let mut timings = Timings::default();

        let start = Instant::now();
        let mut mon_a = mon_a.clone();
        let mut mon_b = mon_b.clone();
        for monomer in [&mut mon_a, &mut mon_b] {
            self.logger
                .debug(format_args!("Predicting atomic properties for {}", monomer.name));
            self.hirshfeld.annotate(monomer)?;
            self.valence_width.annotate(monomer)?;
        }
        timings.properties = start.elapsed();

        let (na, nb) = (mon_a.num_atoms(), mon_b.num_atoms());
        let mut decompositions: Vec<EnergyDecomposition> = ComponentKind::ALL
            .iter()
            .map(|&kind| EnergyDecomposition::zeros(kind, na, nb))
            .collect();
        let mut energies = ComponentEnergies::default();

        for component in &self.components {
            let start = Instant::now();
            let result = component.evaluate(&mon_a, &mon_b, &self.cell)?;
            let kind = component.kind();
            timings.components[kind.index()] += start.elapsed();

            let slot = &mut decompositions[kind.index()];
            slot.matrix += &result.matrix;
            slot.total += result.total;
            energies.add(kind, result.total);
            self.logger.debug(format_args!(
                "{} ({}) for {} / {}: {:.5} kcal/mol",
                component.name(),
                kind,
                mon_a.name,
                mon_b.name,
                result.total
            ));
        }

        Ok(InteractionResult {
            mon_a: mon_a.name,
            mon_b: mon_b.name,
            total: energies.total(),
            energies,
            decompositions,
            timings,
        })
    }

    /// Evaluate independent dimers in parallel; each job reports its own error
    pub fn evaluate_batch(
        &self,
        pairs: &[(Monomer, Monomer)],
    ) -> Vec<Result<InteractionResult, PipelineError>> {
        self.logger
            .info(format_args!("Evaluating {} dimers", pairs.len()));
        pairs
            .par_iter()
            .map(|(a, b)| self.evaluate(a, b))
            .collect()
    }
}

fn build_predictor(
    property: AtomicProperty,
    options: &PropertyOptions,
    memory_warning_gb: f64,
) -> Result<PropertyPredictor, PipelineError> {
    let mut predictor = PropertyPredictor::new(property, options.max_neighbors)
        .with_source(options.source)
        .with_memory_warning(memory_warning_gb);

    if let Some(dir) = &options.cache_dir {
        predictor = predictor.with_cache(Box::new(DirectoryCache::new(dir, property.cache_suffix())));
    }

    if options.source == PropertySource::Model {
        match &options.model {
            Some(path) => predictor.load_model(path)?,
            None if options.cache_dir.is_some() => {}
            None => {
                return Err(ConfigError::Invalid(format!(
                    "a model path is required to predict {}",
                    property
                ))
                .into())
            }
        }
    }
    Ok(predictor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::cell::MinimumImage;
    use crate::logging::Silent;
    use nalgebra::Vector3;

    fn water(name: &str, offset: Vector3<f64>) -> Monomer {
        let atoms = vec![
            Atom::new("O", Vector3::new(0.0, 0.0, 0.0) + offset).unwrap(),
            Atom::new("H", Vector3::new(0.9572, 0.0, 0.0) + offset).unwrap(),
            Atom::new("H", Vector3::new(-0.24, 0.9266, 0.0) + offset).unwrap(),
        ];
        Monomer::new(name, atoms).unwrap()
    }

    fn free_atom_calculator() -> InteractionCalculator {
        let silent: Arc<dyn Logger> = Arc::new(Silent);
        let h = PropertyPredictor::new(AtomicProperty::HirshfeldRatio, 4)
            .with_source(PropertySource::FreeAtom)
            .with_logger(silent.clone());
        let vw = PropertyPredictor::new(AtomicProperty::ValenceWidth, 4)
            .with_source(PropertySource::FreeAtom)
            .with_logger(silent.clone());
        InteractionCalculator::new(h, vw, Cell::default())
            .with_components(vec![Box::new(TangToennies::default().with_logger(silent.clone()))])
            .with_logger(silent)
    }

    /// Constant per-pair energy standing in for an external model
    struct Constant(f64, ComponentKind);

    impl EnergyComponent for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn kind(&self) -> ComponentKind {
            self.1
        }

        fn evaluate(
            &self,
            mon_a: &Monomer,
            mon_b: &Monomer,
            _cell: &dyn MinimumImage,
        ) -> Result<EnergyDecomposition, ComponentError> {
            let m = DMatrix::from_element(mon_a.num_atoms(), mon_b.num_atoms(), self.0);
            Ok(EnergyDecomposition::from_matrix(self.1, m))
        }
    }

    #[test]
    fn test_dispersion_only_dimer() {
        let calc = free_atom_calculator();
        let a = water("a", Vector3::zeros());
        let b = water("b", Vector3::new(0.0, 0.0, 3.0));
        let result = calc.evaluate(&a, &b).unwrap();

        assert_eq!(result.mon_a, "a");
        assert_eq!(result.shape(), (3, 3));
        assert!(result.energies.dispersion < 0.0);
        assert_eq!(result.energies.electrostatics, 0.0);
        assert_eq!(result.total, result.energies.dispersion);
        assert!(result.matrix(ComponentKind::Exchange).iter().all(|e| *e == 0.0));
        assert!((result.total_matrix().sum() - result.total).abs() < 1e-8);
    }

    #[test]
    fn test_external_components_are_summed() {
        let calc = free_atom_calculator()
            .with_component(Box::new(Constant(0.5, ComponentKind::Electrostatics)))
            .with_component(Box::new(Constant(0.25, ComponentKind::Electrostatics)));
        let a = water("a", Vector3::zeros());
        let b = water("b", Vector3::new(0.0, 0.0, 3.0));
        let result = calc.evaluate(&a, &b).unwrap();

        assert!((result.energies.electrostatics - 9.0 * 0.75).abs() < 1e-12);
        assert!((result.matrix(ComponentKind::Electrostatics)[(1, 2)] - 0.75).abs() < 1e-12);
        assert!(
            (result.total - result.energies.electrostatics - result.energies.dispersion).abs() < 1e-12
        );
    }

    #[test]
    fn test_monomer_count() {
        let calc = free_atom_calculator();
        let a = water("a", Vector3::zeros());
        assert!(matches!(
            calc.evaluate_monomers(&[a.clone()]),
            Err(PipelineError::MonomerCount(1))
        ));
        assert!(matches!(
            calc.evaluate_monomers(&[a.clone(), a.clone(), a]),
            Err(PipelineError::MonomerCount(3))
        ));
    }

    #[test]
    fn test_batch_reports_errors_per_job() {
        let calc = free_atom_calculator();
        let a = water("a", Vector3::zeros());
        let b = water("b", Vector3::new(0.0, 0.0, 3.0));
        // Sulfur has no tabulated free-atom valence width
        let s = Monomer::new(
            "s",
            vec![Atom::new("S", Vector3::new(0.0, 0.0, 4.0)).unwrap()],
        )
        .unwrap();

        let results = calc.evaluate_batch(&[(a.clone(), b.clone()), (a, s)]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PipelineError::Property(_))));
    }

    #[test]
    fn test_model_source_requires_model() {
        let options = Options::default();
        assert!(matches!(
            InteractionCalculator::from_options(&options),
            Err(PipelineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_result_serializes_totals_only() {
        let calc = free_atom_calculator();
        let a = water("a", Vector3::zeros());
        let b = water("b", Vector3::new(0.0, 0.0, 3.0));
        let result = calc.evaluate(&a, &b).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mon_b"], "b");
        assert!(json["energies"]["dispersion"].as_f64().unwrap() < 0.0);
        assert!(json.get("decompositions").is_none());
    }
}
