pub mod isotope_table;
pub mod periodic_table;
pub mod formula;
pub mod fft;
pub mod mercury;
pub mod variant;
pub mod averagine;
pub mod model_library;

pub mod charge;
pub mod candidate;
pub mod scorer;
pub mod search;
pub mod solution;
pub mod api;

pub use api::{analyze_window, HardklorEngine, HardklorError, HardklorParams, WindowResult};
pub use mercury::{Mercury, PROTON};
pub use search::{Combination, SearchAlgorithm, SearchStrategy};
