//! Reading centroided peak lists from delimited text
use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use mzpeaks::CentroidPeak;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PeakListError {
    #[error("An IO error occurred while reading a peak list: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Malformed peak on line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

/// Read `m/z intensity` pairs, one per line, separated by whitespace or commas.
///
/// Blank lines, lines starting with `#` and a leading header line that does not start
/// with a number are skipped. Peaks are returned sorted by m/z.
pub fn read_peak_list<R: BufRead>(reader: R) -> Result<Vec<CentroidPeak>, PeakListError> {
    let mut peaks = Vec::new();
    let mut at_first_row = true;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty());
        let malformed = || PeakListError::Malformed {
            line: i + 1,
            content: line.clone(),
        };
        let (Some(mz), Some(intensity)) = (fields.next(), fields.next()) else {
            return Err(malformed());
        };
        let mz = match mz.parse::<f64>() {
            Ok(mz) => mz,
            Err(_) if at_first_row => {
                at_first_row = false;
                continue;
            }
            Err(_) => return Err(malformed()),
        };
        at_first_row = false;
        let intensity = intensity.parse::<f32>().map_err(|_| malformed())?;
        peaks.push(CentroidPeak::new(mz, intensity, 0));
    }
    peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
    for (i, peak) in peaks.iter_mut().enumerate() {
        peak.index = i as u32;
    }
    debug!("Read {} peaks", peaks.len());
    Ok(peaks)
}

/// Read a peak list from `path`, or from STDIN if `path` is `-`
pub fn open_peak_list<P: AsRef<Path>>(path: P) -> Result<Vec<CentroidPeak>, PeakListError> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        read_peak_list(io::stdin().lock())
    } else {
        read_peak_list(io::BufReader::new(fs::File::open(path)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read() {
        let text = "# a comment\nmz\tintensity\n500.0 100\n\n500.5,55.5\n501.0\t20 extra\n";
        let peaks = read_peak_list(io::Cursor::new(text)).unwrap();
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[1].mz, 500.5);
        assert_eq!(peaks[1].intensity, 55.5);
        assert_eq!(peaks[2].index, 2);

        let peaks = read_peak_list(io::Cursor::new("501.0 10\n500.0 20\n")).unwrap();
        assert_eq!(peaks[0].mz, 500.0);
        assert_eq!(peaks[0].index, 0);
        assert_eq!(peaks[1].intensity, 10.0);
    }

    #[test]
    fn test_malformed() {
        let err = read_peak_list(io::Cursor::new("500.0 100\n500.5 abc\n")).unwrap_err();
        assert!(matches!(err, PeakListError::Malformed { line: 2, .. }));
        let err = read_peak_list(io::Cursor::new("500.0 100\nmz intensity\n")).unwrap_err();
        assert!(matches!(err, PeakListError::Malformed { line: 2, .. }));
        let err = read_peak_list(io::Cursor::new("500.0\n")).unwrap_err();
        assert!(matches!(err, PeakListError::Malformed { line: 1, .. }));
    }
}
