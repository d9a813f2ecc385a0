mod args;
mod driver;
mod peak_list;

pub use args::*;
pub use driver::{
    AveragineCommand, Command, MZHardklor, MZHardklorError, MercuryCommand, OutputFormat,
    SearchCommand, SearchReport,
};
pub use peak_list::{open_peak_list, read_peak_list, PeakListError};
