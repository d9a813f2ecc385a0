/*! A precomputed cache of averagine isotopic distributions.

The library holds one [`Distribution`] per (charge, variant, mass bucket) in a single
contiguous store. Buckets are fixed-width m/z intervals and each is modeled at its
center. Looking up a distribution for an m/z returns the bucket model, which callers
shift onto the observed peak they are explaining.
*/
use thiserror::Error;
use tracing::{debug, trace};

use crate::averagine::Averagine;
use crate::formula::Formula;
use crate::mercury::{Distribution, Mercury, MercuryError, PROTON};
use crate::variant::Variant;

#[derive(Debug, Error)]
pub enum ModelLibraryError {
    #[error("Charge {charge} is outside of the library's range {min}..={max}")]
    ChargeOutOfRange { charge: i32, min: i32, max: i32 },
    #[error("Variant {index} is outside of the library's {count} variants")]
    VariantOutOfRange { index: usize, count: usize },
    #[error("m/z {mz} is outside of the library's mass buckets")]
    MassOutOfRange { mz: f64 },
    #[error("The model library has not been built")]
    NotBuilt,
    #[error("Invalid model library bounds: {0}")]
    InvalidBounds(String),
    #[error("Failed to compute a model distribution: {0}")]
    MercuryError(
        #[from]
        #[source]
        MercuryError,
    ),
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelLibraryParams {
    /// The width of each mass bucket in m/z
    pub bucket_width: f64,
    pub bucket_count: usize,
    /// Peaks with a smaller fractional abundance are dropped from each model
    pub min_fraction: f64,
}

impl Default for ModelLibraryParams {
    fn default() -> Self {
        Self {
            bucket_width: 5.0,
            bucket_count: 400,
            min_fraction: 0.01,
        }
    }
}

impl ModelLibraryParams {
    pub fn new(bucket_width: f64, bucket_count: usize, min_fraction: f64) -> Self {
        Self {
            bucket_width,
            bucket_count,
            min_fraction,
        }
    }

    /// The largest m/z the buckets cover
    pub fn max_mz(&self) -> f64 {
        self.bucket_width * self.bucket_count as f64
    }
}

/// One cached model distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelEntry {
    /// The m/z the model was computed for, the center of its bucket
    pub mz: f64,
    pub formula: Formula,
    pub distribution: Distribution,
}

impl ModelEntry {
    pub fn area(&self) -> f64 {
        self.distribution.area
    }

    pub fn mono_mass(&self) -> f64 {
        self.distribution.zero_mass
    }

    pub fn is_empty(&self) -> bool {
        self.distribution.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ModelLibrary {
    pub params: ModelLibraryParams,
    averagine: Averagine,
    mercury: Mercury,
    charge_range: (i32, i32),
    variants: Vec<Variant>,
    entries: Vec<ModelEntry>,
}

impl ModelLibrary {
    pub fn new(averagine: Averagine, mercury: Mercury, params: ModelLibraryParams) -> Self {
        Self {
            params,
            averagine,
            mercury,
            charge_range: (0, 0),
            variants: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn averagine(&self) -> &Averagine {
        &self.averagine
    }

    pub fn mercury(&self) -> &Mercury {
        &self.mercury
    }

    pub fn is_built(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn charge_range(&self) -> (i32, i32) {
        self.charge_range
    }

    /// The variants the library was built for, the identity variant first when included
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Discard all cached distributions
    pub fn erase(&mut self) {
        self.entries.clear();
        self.variants.clear();
        self.charge_range = (0, 0);
    }

    /// Compute models for every charge in `charge_low..=charge_high`, every variant
    /// and every mass bucket, replacing anything built before
    pub fn build(
        &mut self,
        charge_low: i32,
        charge_high: i32,
        variants: &[Variant],
        include_identity: bool,
    ) -> Result<(), ModelLibraryError> {
        self.erase();
        if charge_low < 1 || charge_low > charge_high {
            return Err(ModelLibraryError::InvalidBounds(format!(
                "charge range {charge_low}..={charge_high}"
            )));
        }
        if self.params.bucket_count == 0 || self.params.bucket_width <= 0.0 {
            return Err(ModelLibraryError::InvalidBounds(format!(
                "{} buckets of width {}",
                self.params.bucket_count, self.params.bucket_width
            )));
        }

        let mut all_variants = Vec::with_capacity(variants.len() + 1);
        if include_identity {
            all_variants.push(Variant::identity());
        }
        all_variants.extend(variants.iter().cloned());
        if all_variants.is_empty() {
            return Err(ModelLibraryError::InvalidBounds(
                "no variants to model".to_string(),
            ));
        }

        let n_charges = (charge_high - charge_low + 1) as usize;
        let mut entries =
            Vec::with_capacity(n_charges * all_variants.len() * self.params.bucket_count);
        for charge in charge_low..=charge_high {
            for variant in all_variants.iter() {
                let mut overlay = self.mercury.overlay();
                for e in variant.enrichments.iter() {
                    overlay.apply(e).map_err(MercuryError::from)?;
                }
                for bucket in 0..self.params.bucket_count {
                    let mz = (bucket as f64 + 0.5) * self.params.bucket_width;
                    let neutral = chemical_elements::neutral_mass(mz, charge, PROTON);
                    let formula = self.averagine.estimate(neutral, variant);
                    let distribution = if formula.is_empty() {
                        Distribution {
                            charge,
                            ..Default::default()
                        }
                    } else {
                        self.mercury
                            .compute_with(
                                &overlay,
                                &formula,
                                charge,
                                self.mercury.params.accurate_mass,
                            )?
                            .retain_fraction(self.params.min_fraction)
                    };
                    trace!("Modeled {mz:.2} at charge {charge} with {} peaks", distribution.len());
                    entries.push(ModelEntry {
                        mz,
                        formula,
                        distribution,
                    });
                }
            }
        }

        debug!(
            "Built {} models for charges {charge_low}..={charge_high} and {} variants",
            entries.len(),
            all_variants.len()
        );
        self.charge_range = (charge_low, charge_high);
        self.variants = all_variants;
        self.entries = entries;
        Ok(())
    }

    fn index_of(&self, charge: i32, variant: usize, mz: f64) -> Result<usize, ModelLibraryError> {
        if !self.is_built() {
            return Err(ModelLibraryError::NotBuilt);
        }
        let (min, max) = self.charge_range;
        if charge < min || charge > max {
            return Err(ModelLibraryError::ChargeOutOfRange { charge, min, max });
        }
        let n_variants = self.variants.len();
        if variant >= n_variants {
            return Err(ModelLibraryError::VariantOutOfRange {
                index: variant,
                count: n_variants,
            });
        }
        let bucket = (mz / self.params.bucket_width).floor();
        if !bucket.is_finite() || bucket < 0.0 || bucket as usize >= self.params.bucket_count {
            return Err(ModelLibraryError::MassOutOfRange { mz });
        }
        let n_buckets = self.params.bucket_count;
        Ok(((charge - min) as usize * n_variants + variant) * n_buckets + bucket as usize)
    }

    /// The model for `charge` and `variant` in the bucket containing `mz`
    pub fn get(&self, charge: i32, variant: usize, mz: f64) -> Result<&ModelEntry, ModelLibraryError> {
        let i = self.index_of(charge, variant, mz)?;
        Ok(&self.entries[i])
    }
}
