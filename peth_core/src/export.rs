//! CSV export of a simulated timeline.

use crate::units::{ng_per_ml_to_umol_per_l, permille_to_percent};
use crate::{Result, SimulationResult, TimelineSample};
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    timestamp: String,
    bac_permille: f64,
    bac_percent: f64,
    biomarker_ng_per_ml: f64,
    biomarker_umol_per_l: f64,
    stomach_grams: f64,
    blood_grams: f64,
}

impl From<&TimelineSample> for CsvRow {
    fn from(sample: &TimelineSample) -> Self {
        CsvRow {
            timestamp: sample.timestamp.to_rfc3339(),
            bac_permille: sample.bac_permille,
            bac_percent: permille_to_percent(sample.bac_permille),
            biomarker_ng_per_ml: sample.biomarker_ng_per_ml,
            biomarker_umol_per_l: ng_per_ml_to_umol_per_l(sample.biomarker_ng_per_ml),
            stomach_grams: sample.stomach_grams,
            blood_grams: sample.blood_grams,
        }
    }
}

/// Write every timeline sample to `path`, replacing any existing file
///
/// Returns the number of rows written. The file is synced to disk before
/// returning.
pub fn write_timeline_csv(result: &SimulationResult, path: &Path) -> Result<usize> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    for sample in &result.timeline {
        writer.serialize(CsvRow::from(sample))?;
    }

    // Flush and sync to disk
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} samples to {:?}", result.timeline.len(), path);
    Ok(result.timeline.len())
}
