//! Main executable for cliff

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cliff::components::ComponentKind;
use cliff::config::Options;
use cliff::io::{
    append_summary_csv, format_summary_table, read_dimer_xyz, read_monomer_xyz, write_atomic_file,
    write_json_summary,
};
use cliff::ml::{Kernel, KrrParams};
use cliff::pipeline::{InteractionCalculator, InteractionResult};
use cliff::properties::{AtomicProperty, PropertyPredictor};
use cliff::Monomer;

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "cliff",
    version = cliff::VERSION,
    about = "Intermolecular interaction energies from learned atomic properties"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PropertyArg {
    Hirshfeld,
    ValenceWidth,
}

impl From<PropertyArg> for AtomicProperty {
    fn from(p: PropertyArg) -> Self {
        match p {
            PropertyArg::Hirshfeld => AtomicProperty::HirshfeldRatio,
            PropertyArg::ValenceWidth => AtomicProperty::ValenceWidth,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict interaction energies of dimers
    Predict {
        /// Dimer xyz file (two frames), or a directory of them
        #[clap(long, short, value_parser, conflicts_with_all = ["mon_a", "mon_b"])]
        dimer: Option<PathBuf>,

        /// Monomer A xyz file; every frame is paired with every frame of B
        #[clap(long, short = 'a', value_parser, requires = "mon_b")]
        mon_a: Option<PathBuf>,

        /// Monomer B xyz file
        #[clap(long, short = 'b', value_parser, requires = "mon_a")]
        mon_b: Option<PathBuf>,

        /// TOML configuration file
        #[clap(long, short, value_parser)]
        config: Option<PathBuf>,

        /// Prefix of the output files
        #[clap(long, short, default_value = "output")]
        name: String,

        /// Also write the energy totals as JSON
        #[clap(long, value_parser)]
        json: Option<PathBuf>,
    },

    /// Train an atomic-property model from labelled xyz files
    Train {
        /// Property to learn
        #[clap(long, value_enum)]
        property: PropertyArg,

        /// xyz files (fifth column holds reference values) or directories of them
        #[clap(long, value_parser, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// Output model file (JSON)
        #[clap(long, short, value_parser)]
        out: PathBuf,

        /// TOML configuration providing defaults for the options below
        #[clap(long, short, value_parser)]
        config: Option<PathBuf>,

        /// Kernel (gaussian, laplacian)
        #[clap(long)]
        kernel: Option<String>,

        /// Kernel width
        #[clap(long)]
        sigma: Option<f64>,

        /// Ridge regularisation
        #[clap(long)]
        lambda: Option<f64>,

        /// Atoms per Coulomb-matrix descriptor
        #[clap(long)]
        max_neighbors: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            dimer,
            mon_a,
            mon_b,
            config,
            name,
            json,
        } => {
            let start = Instant::now();
            let options = load_options(config.as_deref())?;
            let calculator = InteractionCalculator::from_options(&options)
                .context("Failed to set up the interaction calculator")?;

            let pairs = match (dimer, mon_a, mon_b) {
                (Some(dimer), _, _) => load_dimers(&dimer)?,
                (None, Some(a), Some(b)) => load_monomer_pairs(&a, &b)?,
                _ => bail!("Either --dimer or both --mon-a and --mon-b must be provided"),
            };
            if pairs.is_empty() {
                bail!("No dimer could be loaded");
            }

            let mut results = Vec::with_capacity(pairs.len());
            for (job, (a, b)) in calculator.evaluate_batch(&pairs).into_iter().zip(&pairs) {
                match job {
                    Ok(result) => results.push(result),
                    Err(e) => error!("Failed to evaluate {} / {}: {}", a.name, b.name, e),
                }
            }

            for line in format_summary_table(&results) {
                info!("    {}", line);
            }
            print_timings(&results);

            if let [single] = results.as_slice() {
                let atomic = PathBuf::from(format!("{}_atomic.txt", name));
                write_atomic_file(&atomic, single).with_context(|| {
                    format!("Failed to write atomic decomposition to {}", atomic.display())
                })?;
                info!("Atomic decomposition written to {}", atomic.display());
            }

            let csv = PathBuf::from(format!("{}.csv", name));
            append_summary_csv(&csv, &results)
                .with_context(|| format!("Failed to append results to {}", csv.display()))?;

            if let Some(json) = json {
                write_json_summary(&json, &results)
                    .with_context(|| format!("Failed to write {}", json.display()))?;
            }

            info!("CLIFF ran in {:.3} s", start.elapsed().as_secs_f64());
            if results.len() != pairs.len() {
                bail!("{} of {} dimers failed", pairs.len() - results.len(), pairs.len());
            }
        }

        Commands::Train {
            property,
            data,
            out,
            config,
            kernel,
            sigma,
            lambda,
            max_neighbors,
        } => {
            let property = AtomicProperty::from(property);
            let options = load_options(config.as_deref())?;
            let defaults = match property {
                AtomicProperty::HirshfeldRatio => &options.hirshfeld,
                AtomicProperty::ValenceWidth => &options.valence_width,
            };

            let params = KrrParams {
                kernel: match kernel {
                    Some(k) => k.parse::<Kernel>()?,
                    None => defaults.kernel,
                },
                sigma: sigma.unwrap_or(defaults.sigma),
                lambda: lambda.unwrap_or(defaults.lambda),
            };
            let max_neighbors = max_neighbors.unwrap_or(defaults.max_neighbors);
            info!(
                "Training {} with a {} kernel (sigma = {}, lambda = {}, {} neighbors)",
                property, params.kernel, params.sigma, params.lambda, max_neighbors
            );

            let mut predictor = PropertyPredictor::new(property, max_neighbors)
                .with_memory_warning(options.ml.memory_warning_gb);
            for file in collect_xyz_files(&data)? {
                let monomers = read_monomer_xyz(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                for monomer in &monomers {
                    predictor
                        .add_monomer_to_training(monomer)
                        .with_context(|| format!("Failed to add {} to training", file.display()))?;
                }
            }

            predictor.train(&params)?;
            predictor
                .save_model(&out)
                .with_context(|| format!("Failed to write model to {}", out.display()))?;
            info!("Model written to {}", out.display());
        }
    }

    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<Options> {
    match path {
        Some(path) => {
            info!("Loading options from {}", path.display());
            Options::load(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))
        }
        None => Ok(Options::default()),
    }
}

/// xyz files named directly, plus the sorted xyz files of named directories
fn collect_xyz_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().map_or(false, |ext| ext == "xyz"))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            bail!("File {} does not exist!", input.display());
        }
    }
    Ok(files)
}

fn load_dimers(input: &Path) -> Result<Vec<(Monomer, Monomer)>> {
    let mut pairs = Vec::new();
    for file in collect_xyz_files(&[input.to_path_buf()])? {
        match read_dimer_xyz(&file) {
            Ok(pair) => pairs.push(pair),
            Err(e) => warn!("Cannot load {}: {}", file.display(), e),
        }
    }
    Ok(pairs)
}

fn load_monomer_pairs(a: &Path, b: &Path) -> Result<Vec<(Monomer, Monomer)>> {
    let mons_a =
        read_monomer_xyz(a).with_context(|| format!("Failed to read monomer {}", a.display()))?;
    let mons_b =
        read_monomer_xyz(b).with_context(|| format!("Failed to read monomer {}", b.display()))?;
    Ok(mons_a
        .iter()
        .flat_map(|ma| mons_b.iter().map(move |mb| (ma.clone(), mb.clone())))
        .collect())
}

fn print_timings(results: &[InteractionResult]) {
    let properties: Duration = results.iter().map(|r| r.timings.properties).sum();
    info!("Component timings");
    info!("    ~Atomic properties: {:10.3} s", properties.as_secs_f64());
    for kind in ComponentKind::ALL {
        let spent: Duration = results
            .iter()
            .map(|r| r.timings.components[kind.index()])
            .sum();
        info!("    ~{:<17}: {:10.3} s", kind.label(), spent.as_secs_f64());
    }
}
