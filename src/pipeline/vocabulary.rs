//! Biomarker name vocabulary: free-text analyte names and abbreviations
//! (Russian/English) to canonical short codes, plus category classification
//! and known-good value ranges per code.
//!
//! Pure lookup tables, read-only at runtime. Changes ship with a deployment.

use std::sync::LazyLock;

use crate::models::enums::BiomarkerCategory;

/// Short, collision-prone abbreviations that must match the whole name
/// exactly. Substring matching would confuse these: "mch" occurs inside
/// "mchc", "t3" inside "ft3", "ист" inside half the Russian language.
const EXACT_ALIASES: &[(&str, &str)] = &[
    ("hb", "HGB"),
    ("hgb", "HGB"),
    ("rbc", "RBC"),
    ("wbc", "WBC"),
    ("plt", "PLT"),
    ("hct", "HCT"),
    ("mcv", "MCV"),
    ("mch", "MCH"),
    ("mchc", "MCHC"),
    ("mpv", "MPV"),
    ("pct", "PCT"),
    ("rdw", "RDW"),
    ("pdw", "PDW"),
    ("esr", "ESR"),
    ("соэ", "ESR"),
    ("glu", "GLU"),
    ("tp", "TP"),
    ("alb", "ALB"),
    ("alt", "ALT"),
    ("алт", "ALT"),
    ("ast", "AST"),
    ("аст", "AST"),
    ("ggt", "GGT"),
    ("ггт", "GGT"),
    ("alp", "ALP"),
    ("ldh", "LDH"),
    ("ck", "CK"),
    ("amy", "AMY"),
    ("lipa", "LIPA"),
    ("crp", "CRP"),
    ("fe", "FE"),
    ("ferr", "FERR"),
    ("ca", "CA"),
    ("mg", "MG"),
    ("k", "K"),
    ("na", "NA"),
    ("p", "P"),
    ("zn", "ZN"),
    ("b12", "B12"),
    ("d3", "D3"),
    ("folate", "FOLATE"),
    ("tsh", "TSH"),
    ("ттг", "TSH"),
    ("t3", "FT3"),
    ("т3", "FT3"),
    ("t4", "FT4"),
    ("т4", "FT4"),
    ("ft3", "FT3"),
    ("ft4", "FT4"),
    ("shbg", "SHBG"),
    ("гспг", "SHBG"),
    ("fai", "FAI"),
    ("ист", "FAI"),
    ("test", "TEST"),
    ("prol", "PROL"),
    ("e2", "E2"),
    ("prog", "PROG"),
    ("lh", "LH"),
    ("лг", "LH"),
    ("fsh", "FSH"),
    ("фсг", "FSH"),
    ("cort", "CORT"),
    ("ins", "INS"),
    ("chol", "CHOL"),
    ("hdl", "HDL"),
    ("ldl", "LDL"),
    ("tg", "TG"),
    ("crea", "CREA"),
    ("urea", "UREA"),
    ("ua", "UA"),
    ("gfr", "GFR"),
    ("скф", "GFR"),
    ("bili", "BILI"),
    ("dbili", "DBILI"),
    ("neut", "NEUT"),
    ("lymph", "LYMPH"),
    ("mono", "MONO"),
    ("eos", "EOS"),
    ("baso", "BASO"),
];

/// Substring aliases: the lowercased raw name contains the key anywhere.
/// Matched longest-key-first (sorted once at startup), so overlapping
/// Russian names like "средняя концентрация hb" vs "среднее содержание hb"
/// resolve to the more specific entry regardless of declaration order.
const SUBSTRING_ALIASES: &[(&str, &str)] = &[
    // Hematology
    ("средняя концентрация hb", "MCHC"),
    ("средняя концентрация гемоглобина", "MCHC"),
    ("среднее содержание hb", "MCH"),
    ("среднее содержание гемоглобина", "MCH"),
    ("средний объем эритроцита", "MCV"),
    ("средний объем тромбоцитов", "MPV"),
    ("ширина распределения эритроцитов", "RDW"),
    ("ширина распределения тромбоцитов", "PDW"),
    ("гемоглобин", "HGB"),
    ("hemoglobin", "HGB"),
    ("эритроциты", "RBC"),
    ("erythrocytes", "RBC"),
    ("лейкоциты", "WBC"),
    ("leukocytes", "WBC"),
    ("тромбокрит", "PCT"),
    ("тромбоциты", "PLT"),
    ("platelets", "PLT"),
    ("гематокрит", "HCT"),
    ("hematocrit", "HCT"),
    ("нейтрофилы", "NEUT"),
    ("neutrophils", "NEUT"),
    ("лимфоциты", "LYMPH"),
    ("lymphocytes", "LYMPH"),
    ("моноциты", "MONO"),
    ("monocytes", "MONO"),
    ("эозинофилы", "EOS"),
    ("eosinophils", "EOS"),
    ("базофилы", "BASO"),
    ("basophils", "BASO"),
    // Biochemistry
    ("глюкоза", "GLU"),
    ("glucose", "GLU"),
    ("общий белок", "TP"),
    ("альбумин", "ALB"),
    ("albumin", "ALB"),
    ("лактатдегидрогеназа", "LDH"),
    ("креатинкиназа", "CK"),
    ("амилаза", "AMY"),
    ("липаза", "LIPA"),
    // Liver
    ("щелочная фосфатаза", "ALP"),
    ("гамма-глутамил", "GGT"),
    ("ггтп", "GGT"),
    ("билирубин прямой", "DBILI"),
    ("билирубин", "BILI"),
    ("bilirubin", "BILI"),
    // Kidney
    ("креатинин", "CREA"),
    ("creatinine", "CREA"),
    ("мочевина", "UREA"),
    ("мочевая кислота", "UA"),
    // Lipids
    ("холестерин", "CHOL"),
    ("cholesterol", "CHOL"),
    ("триглицериды", "TG"),
    ("triglycerides", "TG"),
    ("лпвп", "HDL"),
    ("лпнп", "LDL"),
    // Minerals
    ("ферритин", "FERR"),
    ("ferritin", "FERR"),
    ("железо", "FE"),
    ("iron", "FE"),
    ("кальций", "CA"),
    ("calcium", "CA"),
    ("магний", "MG"),
    ("magnesium", "MG"),
    ("калий", "K"),
    ("potassium", "K"),
    ("натрий", "NA"),
    ("sodium", "NA"),
    ("фосфор", "P"),
    ("цинк", "ZN"),
    ("zinc", "ZN"),
    // Vitamins
    ("витамин b12", "B12"),
    ("кобаламин", "B12"),
    ("фолиевая", "FOLATE"),
    ("витамин d", "D3"),
    // Thyroid / hormones
    ("тиреотропный", "TSH"),
    ("thyrotropin", "TSH"),
    ("свободный т4", "FT4"),
    ("т4 своб", "FT4"),
    ("free t4", "FT4"),
    ("свободный т3", "FT3"),
    ("т3 своб", "FT3"),
    ("free t3", "FT3"),
    ("индекс своб", "FAI"),
    ("free androgen", "FAI"),
    ("тестостерон", "TEST"),
    ("testosterone", "TEST"),
    ("пролактин", "PROL"),
    ("prolactin", "PROL"),
    ("sex hormone", "SHBG"),
    ("эстрадиол", "E2"),
    ("estradiol", "E2"),
    ("прогестерон", "PROG"),
    ("progesterone", "PROG"),
    ("кортизол", "CORT"),
    ("cortisol", "CORT"),
    ("инсулин", "INS"),
    ("insulin", "INS"),
    // Inflammation
    ("с-реактивный", "CRP"),
    ("c-reactive", "CRP"),
];

/// Substring table sorted by key length descending; declaration order
/// breaks ties, which keeps matching deterministic.
static SUBSTRING_BY_SPECIFICITY: LazyLock<Vec<(&'static str, &'static str)>> =
    LazyLock::new(|| {
        let mut table: Vec<_> = SUBSTRING_ALIASES.to_vec();
        table.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        table
    });

/// Known-good value ranges per code, in the unit the code is conventionally
/// reported in. Used by decimal repair when the source text carries no
/// reference range. Deliberately generous: these gate a heuristic, they are
/// not clinical reference ranges.
const KNOWN_RANGES: &[(&str, f64, f64)] = &[
    ("HGB", 110.0, 170.0),
    ("RBC", 3.5, 5.5),
    ("WBC", 4.0, 9.0),
    ("PLT", 150.0, 400.0),
    ("HCT", 35.0, 50.0),
    ("MCV", 80.0, 100.0),
    ("MCH", 27.0, 34.0),
    ("MCHC", 320.0, 360.0),
    ("RDW", 11.5, 14.5),
    ("MPV", 7.4, 10.4),
    ("ESR", 1.0, 20.0),
    ("GLU", 3.9, 6.1),
    ("CHOL", 3.0, 5.2),
    ("TG", 0.4, 1.7),
    ("HDL", 1.0, 2.2),
    ("LDL", 1.4, 3.3),
    ("ALT", 5.0, 41.0),
    ("AST", 5.0, 40.0),
    ("GGT", 10.0, 71.0),
    ("ALP", 40.0, 130.0),
    ("BILI", 3.4, 20.5),
    ("CREA", 44.0, 106.0),
    ("UREA", 2.5, 8.3),
    ("UA", 150.0, 420.0),
    ("FE", 9.0, 30.4),
    ("FERR", 13.0, 400.0),
    ("B12", 187.0, 883.0),
    ("D3", 30.0, 100.0),
    ("FOLATE", 3.1, 20.0),
    ("CA", 2.15, 2.55),
    ("MG", 0.66, 1.07),
    ("K", 3.5, 5.1),
    ("NA", 136.0, 145.0),
    ("TSH", 0.4, 4.0),
    ("FT4", 12.0, 22.0),
    ("FT3", 3.1, 6.8),
    ("CRP", 0.0, 5.0),
    ("TEST", 8.6, 29.0),
    ("PROL", 86.0, 324.0),
    ("INS", 2.6, 24.9),
];

/// Normalize a free-text analyte name to its canonical code.
///
/// Lowercase + trim, exact match first, then longest-substring match.
/// Unknown names yield the upper-cased first-10-character prefix so that
/// downstream dedup still has a stable key. Pure and deterministic.
pub fn normalize_code(raw_name: &str) -> String {
    let name = raw_name.trim().to_lowercase();

    for (alias, code) in EXACT_ALIASES {
        if name == *alias {
            return (*code).to_string();
        }
    }

    for (alias, code) in SUBSTRING_BY_SPECIFICITY.iter() {
        if name.contains(alias) {
            return (*code).to_string();
        }
    }

    // Best-effort fallback: no mapping, keep a truncated uppercase prefix.
    raw_name
        .trim()
        .chars()
        .take(10)
        .collect::<String>()
        .to_uppercase()
}

/// Whether a code is already one of the canonical short codes.
pub fn is_canonical(code: &str) -> bool {
    EXACT_ALIASES.iter().any(|(_, c)| *c == code)
}

/// Known-good value range for decimal repair, if one is on file.
pub fn known_range(code: &str) -> Option<(f64, f64)> {
    KNOWN_RANGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, min, max)| (*min, *max))
}

/// Category classification for a canonical code.
pub fn category(code: &str) -> BiomarkerCategory {
    match code {
        "HGB" | "RBC" | "WBC" | "PLT" | "HCT" | "MCV" | "MCH" | "MCHC" | "RDW" | "PDW"
        | "MPV" | "PCT" | "ESR" | "NEUT" | "LYMPH" | "MONO" | "EOS" | "BASO" => {
            BiomarkerCategory::Hematology
        }
        "GLU" | "TP" | "ALB" | "LDH" | "CK" | "AMY" | "LIPA" => BiomarkerCategory::Biochemistry,
        "ALT" | "AST" | "GGT" | "ALP" | "BILI" | "DBILI" => BiomarkerCategory::Liver,
        "CREA" | "UREA" | "UA" | "GFR" => BiomarkerCategory::Kidney,
        "CHOL" | "HDL" | "LDL" | "TG" => BiomarkerCategory::Lipids,
        "FE" | "FERR" | "CA" | "MG" | "K" | "NA" | "P" | "ZN" => BiomarkerCategory::Minerals,
        "B12" | "FOLATE" | "D3" => BiomarkerCategory::Vitamins,
        "TSH" | "FT3" | "FT4" => BiomarkerCategory::Thyroid,
        "TEST" | "SHBG" | "PROL" | "FAI" | "E2" | "PROG" | "LH" | "FSH" | "CORT" | "INS" => {
            BiomarkerCategory::Hormones
        }
        "CRP" => BiomarkerCategory::Inflammation,
        _ => BiomarkerCategory::Other,
    }
}
