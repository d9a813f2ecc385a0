use std::fs;
use std::io::{self, prelude::*};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use mzhardklor::averagine::Averagine;
use mzhardklor::formula::{Formula, FormulaError};
use mzhardklor::isotope_table::IsotopeTable;
use mzhardklor::mercury::{Distribution, MercuryError, MercuryParams};
use mzhardklor::periodic_table::PeriodicTable;
use mzhardklor::scorer::ScoreType;
use mzhardklor::search::SearchAlgorithm;
use mzhardklor::solution::FeatureSolution;
use mzhardklor::variant::{Variant, VariantError};
use mzhardklor::{HardklorEngine, HardklorError, HardklorParams, Mercury, WindowResult, PROTON};

use crate::args::{ArgAveragineModel, ArgChargeRange, ArgChargeStrategy, ArgSearchAlgorithm};
use crate::peak_list::{open_peak_list, PeakListError};

fn positive_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value.is_nan() || value <= 0.0 {
        Err(format!("`{s}` is not greater than zero"))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum MZHardklorError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read the peak list: {0}")]
    PeakListError(
        #[source]
        #[from]
        PeakListError,
    ),
    #[error("Failed to read the configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to parse the formula: {0}")]
    FormulaError(
        #[source]
        #[from]
        FormulaError,
    ),
    #[error("Failed to parse the variant: {0}")]
    VariantError(
        #[source]
        #[from]
        VariantError,
    ),
    #[error("{0}")]
    MercuryError(
        #[source]
        #[from]
        MercuryError,
    ),
    #[error("{0}")]
    HardklorError(
        #[source]
        #[from]
        HardklorError,
    ),
    #[error("Failed to write the configuration: {0}")]
    TOMLError(
        #[source]
        #[from]
        toml::ser::Error,
    ),
    #[error("Failed to write JSON: {0}")]
    JSONError(
        #[source]
        #[from]
        serde_json::Error,
    ),
}

/// Isotopic distribution modeling and isotopic envelope search for mass spectra.
#[derive(Parser, Debug)]
#[command(author, version)]
pub struct MZHardklor {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the isotopic distribution of a molecular formula
    Mercury(MercuryCommand),
    /// Estimate an averagine formula for an m/z and charge
    Averagine(AveragineCommand),
    /// Search a window of centroided peaks for the mixture of isotopic envelopes
    /// that best explains it
    Search(SearchCommand),
}

impl MZHardklor {
    pub fn main(&self) -> Result<(), MZHardklorError> {
        info!(
            "mzhardklor v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        match &self.command {
            Command::Mercury(command) => command.main(),
            Command::Averagine(command) => command.main(),
            Command::Search(command) => command.main(),
        }
    }
}

fn write_distribution<W: Write>(
    writer: &mut W,
    distribution: &Distribution,
) -> Result<(), MZHardklorError> {
    writeln!(writer, "mz\tintensity\tfraction")?;
    for peak in distribution.iter() {
        writeln!(
            writer,
            "{:.5}\t{:.6}\t{:.6}",
            peak.mz, peak.intensity, peak.fraction
        )?;
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct MercuryCommand {
    /// The molecular formula, e.g. C6H12O6
    #[arg()]
    pub formula: String,

    /// The charge state, zero for neutral masses
    #[arg(short = 'z', long = "charge", default_value_t = 1, allow_negative_numbers = true)]
    pub charge: i32,

    /// Resolve exact peak masses instead of rescaling nominal masses
    #[arg(long = "accurate")]
    pub accurate: bool,

    /// A variant to apply to the formula before computing, e.g. "99.0N1" or "C2H3N1O1"
    #[arg(short = 'm', long = "variant")]
    pub variant: Option<String>,

    /// Drop peaks whose fraction of the whole distribution is below this
    #[arg(short = 'f', long = "min-fraction", default_value_t = 0.0)]
    pub min_fraction: f64,

    /// Transformed values at or below this level are treated as numerical noise
    #[arg(long = "noise-floor", default_value_t = 0.0)]
    pub noise_floor: f64,

    /// An isotope table file to use instead of the built-in table
    #[arg(long = "isotope-table")]
    pub isotope_table: Option<PathBuf>,
}

impl MercuryCommand {
    pub fn main(&self) -> Result<(), MZHardklorError> {
        let isotopes = IsotopeTable::load(self.isotope_table.as_ref());
        let elements = PeriodicTable::from_isotopes(&isotopes);
        let mut formula = Formula::parse(&self.formula, &elements)?;
        let variant = match self.variant.as_deref() {
            Some(text) => Variant::parse(text, &elements)?,
            None => Variant::identity(),
        };
        variant.apply_atoms(&mut formula);
        debug!(
            "Computing {} at charge {}",
            formula.display(&elements),
            self.charge
        );
        let mercury = Mercury::with_params(
            isotopes,
            MercuryParams::new(self.accurate, self.noise_floor),
        );
        let distribution = mercury
            .compute_enriched(&formula, self.charge, &variant.enrichments, self.accurate)?
            .retain_fraction(self.min_fraction);
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_distribution(&mut handle, &distribution)
    }
}

#[derive(Args, Debug)]
pub struct AveragineCommand {
    /// The observed m/z, or the neutral mass when the charge is zero
    #[arg()]
    pub mz: f64,

    /// The charge state
    #[arg(short = 'z', long = "charge", default_value_t = 1, allow_negative_numbers = true)]
    pub charge: i32,

    /// The averagine model to estimate the composition with
    #[arg(short = 'a', long = "model", default_value = "peptide")]
    pub model: ArgAveragineModel,

    /// A variant whose atoms and enrichments are applied to the estimate
    #[arg(short = 'm', long = "variant")]
    pub variant: Option<String>,

    /// Also print the isotopic distribution of the estimate
    #[arg(short = 'd', long = "distribution")]
    pub distribution: bool,
}

impl AveragineCommand {
    fn neutral_mass(&self) -> f64 {
        if self.charge == 0 {
            self.mz
        } else {
            self.mz * self.charge.abs() as f64 - self.charge as f64 * PROTON
        }
    }

    pub fn main(&self) -> Result<(), MZHardklorError> {
        let isotopes = IsotopeTable::builtin();
        let elements = PeriodicTable::from_isotopes(&isotopes);
        let variant = match self.variant.as_deref() {
            Some(text) => Variant::parse(text, &elements)?,
            None => Variant::identity(),
        };
        let averagine = Averagine::new(self.model.into(), elements, isotopes.clone());
        let mass = self.neutral_mass();
        let formula = averagine.estimate(mass, &variant);

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "formula\t{}", formula.display(averagine.periodic_table()))?;
        match formula.mono_mass(averagine.periodic_table()) {
            Some(mono) => writeln!(handle, "monoisotopic_mass\t{mono:.5}")?,
            None => warn!("Could not compute the monoisotopic mass of the estimate"),
        }
        if self.distribution {
            let mercury = Mercury::new(isotopes);
            let distribution =
                mercury.compute_enriched(&formula, self.charge, &variant.enrichments, false)?;
            write_distribution(&mut handle, &distribution)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated features preceded by a summary comment
    #[default]
    Text,
    /// A single JSON document
    Json,
}

/// The serialized form of a searched window
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub algorithm: SearchAlgorithm,
    pub score: ScoreType,
    pub accepted: bool,
    pub peaks: usize,
    pub candidates: usize,
    pub evaluations: usize,
    pub features: Vec<FeatureSolution>,
}

impl SearchReport {
    pub fn new(params: &HardklorParams, peaks: usize, result: &WindowResult) -> Self {
        Self {
            algorithm: params.algorithm,
            score: result.score(),
            accepted: result.is_accepted(params.correlation_threshold),
            peaks,
            candidates: result.candidates,
            evaluations: result.evaluations,
            features: result.hypotheses.clone(),
        }
    }

    pub fn write_text<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "# algorithm={} score={:.4} accepted={} peaks={} candidates={} evaluations={}",
            self.algorithm,
            self.score,
            self.accepted,
            self.peaks,
            self.candidates,
            self.evaluations
        )?;
        writeln!(
            writer,
            "neutral_mass\tmz\tcharge\tintensity\tarea\tbase_mz\tmodification"
        )?;
        for feature in self.features.iter() {
            writeln!(
                writer,
                "{:.5}\t{:.5}\t{}\t{:.2}\t{:.2}\t{:.5}\t{}",
                feature.neutral_mass,
                feature.mz(),
                feature.charge,
                feature.intensity,
                feature.area,
                feature.base_mz,
                feature.modification
            )?;
        }
        Ok(())
    }
}

#[derive(Args, Debug, Default)]
pub struct SearchCommand {
    /// The path to read the peak list from, or if '-' is passed, read from STDIN
    #[arg()]
    pub input_file: String,

    /// The path to write the output to, or if '-' is passed, write to STDOUT
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// A TOML file to read search parameters from.
    ///
    /// Configurations are also read from `mzhardklor.toml` in the working directory.
    /// Environment variables prefixed with `MZHARDKLOR_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Write the merged search parameters to this TOML file
    #[arg(long = "write-config")]
    pub write_config: Option<PathBuf>,

    /// The search strategy
    #[arg(short = 'a', long = "algorithm")]
    pub algorithm: Option<ArgSearchAlgorithm>,

    /// The range of charge states to consider denoted [low]-[high] or [high]
    #[arg(short = 'z', long = "charge-range")]
    pub charge_range: Option<ArgChargeRange>,

    /// How to choose the charge states tried for each peak
    #[arg(long = "charge-strategy")]
    pub charge_strategy: Option<ArgChargeStrategy>,

    /// The correlation a combination must exceed to be accepted
    #[arg(short = 'c', long = "correlation-threshold")]
    pub correlation_threshold: Option<ScoreType>,

    /// The most features a window may be explained by
    #[arg(short = 'd', long = "max-depth")]
    pub max_depth: Option<usize>,

    /// A variant to model in addition to the configured ones. May be repeated.
    #[arg(short = 'm', long = "variant")]
    pub variants: Vec<String>,

    /// The mass error tolerance in parts-per-million
    #[arg(short = 'p', long = "ppm", value_parser = positive_float)]
    pub error_tolerance_ppm: Option<f64>,

    /// The most candidate features to consider, zero for all of them
    #[arg(short = 'n', long = "max-candidates")]
    pub max_candidates: Option<usize>,

    /// The averagine model to estimate compositions with
    #[arg(long = "averagine")]
    pub averagine: Option<ArgAveragineModel>,
}

impl SearchCommand {
    /// Merge the configuration sources, lowest priority first
    pub fn configuration(&self) -> Figment {
        let mut config = Figment::from(Serialized::defaults(HardklorParams::default()))
            .merge(Toml::file("mzhardklor.toml"));
        if let Some(path) = self.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config.merge(Env::prefixed("MZHARDKLOR_"))
    }

    /// Read the merged configuration and apply the command line overrides
    pub fn params(&self) -> Result<HardklorParams, MZHardklorError> {
        let mut params: HardklorParams = self.configuration().extract()?;
        if let Some(algorithm) = self.algorithm {
            params.algorithm = algorithm.into();
        }
        if let Some(charge_range) = self.charge_range {
            params.charge_range = charge_range.into();
        }
        if let Some(charge_strategy) = self.charge_strategy {
            params.charge_strategy = charge_strategy.into();
        }
        if let Some(threshold) = self.correlation_threshold {
            params.correlation_threshold = threshold;
        }
        if let Some(depth) = self.max_depth {
            params.max_depth = depth;
        }
        if let Some(ppm) = self.error_tolerance_ppm {
            params.error_tolerance_ppm = ppm;
        }
        if let Some(max_candidates) = self.max_candidates {
            params.max_candidates = max_candidates;
        }
        if let Some(model) = self.averagine {
            params.averagine = model.into();
        }
        params.variants.extend(self.variants.iter().cloned());
        Ok(params)
    }

    pub fn main(&self) -> Result<(), MZHardklorError> {
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());
        let params = self.params()?;
        debug!("Search parameters: {params:?}");
        if let Some(path) = self.write_config.as_ref() {
            fs::write(path, toml::to_string_pretty(&params)?)?;
            info!("Wrote configuration to {}", path.display());
        }

        let peaks = open_peak_list(&self.input_file)?;
        if peaks.is_empty() {
            warn!("No peaks were read from {}", self.input_file);
        }
        let engine = HardklorEngine::new(params)?;
        let result = engine.analyze_window(&peaks)?;
        let report = SearchReport::new(engine.params(), peaks.len(), &result);
        info!(
            "{} explained {} peaks with {} features, score {:.4} ({} evaluations)",
            report.algorithm,
            report.peaks,
            report.features.len(),
            report.score,
            report.evaluations
        );
        if !report.accepted && !report.features.is_empty() {
            info!(
                "Best combination did not exceed the correlation threshold {}",
                engine.params().correlation_threshold
            );
        }

        let mut writer: Box<dyn Write> = if self.output_file == PathBuf::from("-") {
            Box::new(io::BufWriter::new(io::stdout()))
        } else {
            Box::new(io::BufWriter::new(fs::File::create(&self.output_file)?))
        };
        match self.format {
            OutputFormat::Text => report.write_text(&mut writer)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &report)?;
                writeln!(writer)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
