//! Reference-range store: fallback ranges by code, gender and age.
//!
//! Extracted text usually carries its own reference range; when it does
//! not, the store supplies a standard one. A miss is not an error, the
//! candidate simply keeps whatever range it arrived with.

use crate::models::Gender;

/// One stored range. `gender`/`age_min`/`age_max` of `None` mean the entry
/// applies regardless of that attribute.
#[derive(Debug, Clone)]
pub struct ReferenceRange {
    pub code: &'static str,
    pub gender: Option<Gender>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub ref_min: Option<f64>,
    pub ref_max: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

impl ReferenceRange {
    const fn broad(code: &'static str, ref_min: f64, ref_max: f64) -> Self {
        Self {
            code,
            gender: None,
            age_min: None,
            age_max: None,
            ref_min: Some(ref_min),
            ref_max: Some(ref_max),
            critical_low: None,
            critical_high: None,
        }
    }

    const fn by_gender(code: &'static str, gender: Gender, ref_min: f64, ref_max: f64) -> Self {
        Self {
            code,
            gender: Some(gender),
            age_min: None,
            age_max: None,
            ref_min: Some(ref_min),
            ref_max: Some(ref_max),
            critical_low: None,
            critical_high: None,
        }
    }

    fn matches(&self, code: &str, gender: Option<Gender>, age: Option<u32>) -> bool {
        if self.code != code {
            return false;
        }
        // A gendered entry needs a known, matching gender.
        if let Some(required) = self.gender {
            if gender != Some(required) {
                return false;
            }
        }
        if self.age_min.is_some() || self.age_max.is_some() {
            let Some(age) = age else { return false };
            if self.age_min.is_some_and(|min| age < min) {
                return false;
            }
            if self.age_max.is_some_and(|max| age > max) {
                return false;
            }
        }
        true
    }

    /// More constrained entries win a lookup over broad ones.
    fn specificity(&self) -> u8 {
        let mut score = 0;
        if self.gender.is_some() {
            score += 2;
        }
        if self.age_min.is_some() || self.age_max.is_some() {
            score += 1;
        }
        score
    }
}

/// Immutable range table, loaded once at process start.
pub struct ReferenceStore {
    entries: Vec<ReferenceRange>,
}

impl ReferenceStore {
    pub fn new(entries: Vec<ReferenceRange>) -> Self {
        Self { entries }
    }

    /// Standard ranges for common Russian-lab panels.
    pub fn builtin() -> Self {
        use Gender::{Female, Male};
        Self::new(vec![
            ReferenceRange::by_gender("HGB", Male, 130.0, 170.0),
            ReferenceRange::by_gender("HGB", Female, 120.0, 150.0),
            ReferenceRange::by_gender("RBC", Male, 4.0, 5.5),
            ReferenceRange::by_gender("RBC", Female, 3.5, 5.0),
            ReferenceRange::broad("WBC", 4.0, 9.0),
            ReferenceRange::broad("PLT", 150.0, 400.0),
            ReferenceRange::by_gender("ESR", Male, 0.0, 10.0),
            ReferenceRange::by_gender("ESR", Female, 0.0, 15.0),
            ReferenceRange::broad("GLU", 3.9, 6.1),
            ReferenceRange::broad("CHOL", 0.0, 5.2),
            ReferenceRange::by_gender("ALT", Male, 0.0, 41.0),
            ReferenceRange::by_gender("ALT", Female, 0.0, 33.0),
            ReferenceRange::by_gender("AST", Male, 0.0, 40.0),
            ReferenceRange::by_gender("AST", Female, 0.0, 32.0),
            ReferenceRange::by_gender("CREA", Male, 62.0, 106.0),
            ReferenceRange::by_gender("CREA", Female, 44.0, 80.0),
            ReferenceRange::by_gender("FE", Male, 11.6, 31.3),
            ReferenceRange::by_gender("FE", Female, 9.0, 30.4),
            ReferenceRange::by_gender("FERR", Male, 30.0, 400.0),
            ReferenceRange::by_gender("FERR", Female, 13.0, 150.0),
            ReferenceRange::broad("B12", 187.0, 883.0),
            ReferenceRange::broad("D3", 30.0, 100.0),
            ReferenceRange::broad("MG", 0.66, 1.07),
            ReferenceRange::broad("ZN", 10.7, 18.4),
            ReferenceRange::broad("TSH", 0.4, 4.0),
            ReferenceRange::broad("FT4", 12.0, 22.0),
        ])
    }

    /// Find the best-matching range for a code and patient attributes.
    pub fn lookup(
        &self,
        code: &str,
        gender: Option<Gender>,
        age: Option<u32>,
    ) -> Option<&ReferenceRange> {
        self.entries
            .iter()
            .filter(|e| e.matches(code, gender, age))
            .max_by_key(|e| e.specificity())
    }
}

impl Default for ReferenceStore {
    fn default() -> Self {
        Self::builtin()
    }
}
