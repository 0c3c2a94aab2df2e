use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AnalysisStatus, BiomarkerStatus};
use crate::pipeline::status::classify;

/// Placeholder unit for candidates whose source text carries no unit.
/// Kept non-empty so every surviving candidate has a usable unit.
pub const UNIT_PLACEHOLDER: &str = "ед.";

/// A single extracted measurement, after validation.
///
/// Identity for deduplication is the `(code, unit)` pair: the same analyte
/// in two units (absolute count vs percentage) is two distinct candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomarkerCandidate {
    /// Canonical short code (HGB, FE, TSH, ...).
    pub code: String,
    /// Original text fragment that produced this candidate. Provenance only.
    pub raw_name: String,
    pub value: f64,
    pub unit: String,
    /// Reference range as stated in the source text, if any.
    pub ref_min: Option<f64>,
    pub ref_max: Option<f64>,
}

impl BiomarkerCandidate {
    /// Deduplication key.
    pub fn identity(&self) -> (&str, &str) {
        (&self.code, &self.unit)
    }
}

/// A persisted measurement: candidate fields plus derived status and
/// ownership. `analysis_id` is None for manually entered values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomarkerRecord {
    pub id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub code: String,
    pub raw_name: String,
    pub value: f64,
    pub unit: String,
    pub ref_min: Option<f64>,
    pub ref_max: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
    pub status: BiomarkerStatus,
    pub measured_at: Option<NaiveDate>,
}

impl BiomarkerRecord {
    pub fn from_candidate(
        candidate: &BiomarkerCandidate,
        analysis_id: Option<Uuid>,
        measured_at: Option<NaiveDate>,
    ) -> Self {
        let mut record = Self {
            id: Uuid::new_v4(),
            analysis_id,
            code: candidate.code.clone(),
            raw_name: candidate.raw_name.clone(),
            value: candidate.value,
            unit: candidate.unit.clone(),
            ref_min: candidate.ref_min,
            ref_max: candidate.ref_max,
            critical_low: None,
            critical_high: None,
            status: BiomarkerStatus::Normal,
            measured_at,
        };
        record.recalculate_status();
        record
    }

    /// Recompute `status` from the current value and bounds. Must be called
    /// whenever `value`, `ref_min` or `ref_max` change.
    pub fn recalculate_status(&mut self) {
        self.status = classify(
            self.value,
            self.ref_min,
            self.ref_max,
            self.critical_low,
            self.critical_high,
        );
    }

    pub fn is_manual_entry(&self) -> bool {
        self.analysis_id.is_none()
    }
}

/// One uploaded analysis and its processing lifecycle.
///
/// Created in `Pending`, advanced by the processor through `Processing` to a
/// terminal `Completed`/`Failed`. Extraction output is written exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub status: AnalysisStatus,
    pub lab_name: Option<String>,
    pub analysis_date: Option<NaiveDate>,
    pub raw_text: Option<String>,
    pub error_message: Option<String>,
    pub biomarkers: Vec<BiomarkerRecord>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl AnalysisRecord {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: AnalysisStatus::Pending,
            lab_name: None,
            analysis_date: None,
            raw_text: None,
            error_message: None,
            biomarkers: Vec::new(),
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn out_of_range_count(&self) -> usize {
        self.biomarkers
            .iter()
            .filter(|b| b.status.is_out_of_range())
            .count()
    }
}

impl Default for AnalysisRecord {
    fn default() -> Self {
        Self::new()
    }
}
