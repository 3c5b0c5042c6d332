//! Differential diagnosis: strict elimination, then proximity scoring.
//!
//! 1. Keep profiles listing the declared symptom (exact, case-sensitive).
//! 2. Drop a profile as soon as one vital falls outside its range.
//! 3. Score survivors by distance to each range's midpoint.
//! 4. Sort by confidence, descending, keeping catalog order on ties.

use serde::Deserialize;
use serde_json::Value;

use super::catalog::DiseaseCatalog;
use super::types::{
    DiagnosisReport, DiagnosisResult, DiagnosisStatus, DiseaseProfile, VitalKind, VitalRange,
    VitalReading,
};
use super::DiagnosisError;

impl DiseaseCatalog {
    /// Rank the profiles compatible with `symptom` and `vitals`.
    ///
    /// An empty match is a normal `Unknown` report, not an error.
    pub fn analyze(&self, symptom: &str, vitals: &VitalReading) -> DiagnosisReport {
        let mut results: Vec<DiagnosisResult> = self
            .profiles()
            .iter()
            .filter(|p| p.has_symptom(symptom))
            .filter(|p| within_all_ranges(p, vitals))
            .map(|p| DiagnosisResult {
                profile: p.clone(),
                confidence: confidence(p, vitals),
            })
            .collect();

        // sort_by is stable: equal scores keep catalog order
        results.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        let (status, message) = match results.len() {
            0 => (
                DiagnosisStatus::Unknown,
                "No disease matches these exact vitals.".to_string(),
            ),
            1 => (
                DiagnosisStatus::Confirmed,
                "Single match found.".to_string(),
            ),
            n => (
                DiagnosisStatus::Multiple,
                format!("Several diseases match the criteria ({n})."),
            ),
        };

        tracing::debug!(
            symptom,
            status = status.as_str(),
            matches = results.len(),
            "Diagnosis analysis complete"
        );

        DiagnosisReport {
            status,
            message,
            results,
        }
    }
}

fn within_all_ranges(profile: &DiseaseProfile, vitals: &VitalReading) -> bool {
    VitalKind::ALL
        .iter()
        .all(|&kind| profile.range(kind).contains(vitals.value(kind)))
}

/// Per-dimension closeness: 1 at the midpoint, 0 at (or past) either bound.
pub fn dimension_score(range: VitalRange, value: f64) -> f64 {
    if value <= range.min || value >= range.max {
        return 0.0;
    }
    let deviation = (value - range.midpoint()).abs() / range.half_width();
    (1.0 - deviation).max(0.0)
}

/// Mean of the four dimension scores as a 0–100 percentage.
pub fn confidence(profile: &DiseaseProfile, vitals: &VitalReading) -> u8 {
    let total: f64 = VitalKind::ALL
        .iter()
        .map(|&kind| dimension_score(profile.range(kind), vitals.value(kind)))
        .sum();
    (total / 4.0 * 100.0).round().clamp(0.0, 100.0) as u8
}

// ═══════════════════════════════════════════════════════════
// Request validation
// ═══════════════════════════════════════════════════════════

/// Wire shape of an analysis request.
///
/// Vitals arrive from a form and may be JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(rename = "visibleSymptom")]
    pub visible_symptom: Option<String>,
    pub vitals: Option<RawVitals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVitals {
    pub temp: Option<Value>,
    pub hr: Option<Value>,
    pub o2: Option<Value>,
    pub bp: Option<Value>,
}

impl AnalyzeRequest {
    /// Validate and coerce into a symptom and a typed reading.
    pub fn into_parts(self) -> Result<(String, VitalReading), DiagnosisError> {
        let symptom = self
            .visible_symptom
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DiagnosisError::InvalidInput("visibleSymptom is required".into()))?;
        let vitals = self
            .vitals
            .ok_or_else(|| DiagnosisError::InvalidInput("vitals are required".into()))?;

        let reading = VitalReading {
            temperature: coerce(VitalKind::Temperature, vitals.temp.as_ref())?,
            heart_rate: coerce(VitalKind::HeartRate, vitals.hr.as_ref())?,
            oxygen_saturation: coerce(VitalKind::OxygenSaturation, vitals.o2.as_ref())?,
            blood_pressure: coerce(VitalKind::BloodPressure, vitals.bp.as_ref())?,
        };
        Ok((symptom, reading))
    }
}

fn coerce(kind: VitalKind, raw: Option<&Value>) -> Result<f64, DiagnosisError> {
    let field = kind.as_str();
    let value = match raw {
        None | Some(Value::Null) => {
            return Err(DiagnosisError::InvalidInput(format!(
                "vitals.{field} is required"
            )))
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    value.filter(|v| v.is_finite()).ok_or_else(|| {
        DiagnosisError::InvalidInput(format!("vitals.{field} must be a number"))
    })
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn catalog() -> DiseaseCatalog {
        DiseaseCatalog::builtin().unwrap()
    }

    fn any_reading() -> impl Strategy<Value = VitalReading> {
        (30.0..45.0f64, 40.0..200.0f64, 60.0..100.0f64, 50.0..160.0f64).prop_map(
            |(temperature, heart_rate, oxygen_saturation, blood_pressure)| VitalReading {
                temperature,
                heart_rate,
                oxygen_saturation,
                blood_pressure,
            },
        )
    }

    fn any_symptom() -> impl Strategy<Value = String> {
        let symptoms = catalog().list_symptoms().to_vec();
        prop::sample::select(symptoms)
    }

    proptest! {
        #[test]
        fn survivors_list_the_symptom_and_fit_every_range(
            symptom in any_symptom(),
            vitals in any_reading(),
        ) {
            let report = catalog().analyze(&symptom, &vitals);
            for result in &report.results {
                prop_assert!(result.profile.has_symptom(&symptom));
                for kind in VitalKind::ALL {
                    prop_assert!(result.profile.range(kind).contains(vitals.value(kind)));
                }
            }
        }

        #[test]
        fn every_compatible_profile_survives(
            symptom in any_symptom(),
            vitals in any_reading(),
        ) {
            let catalog = catalog();
            let expected = catalog
                .profiles()
                .iter()
                .filter(|p| p.has_symptom(&symptom) && within_all_ranges(p, &vitals))
                .count();
            prop_assert_eq!(catalog.analyze(&symptom, &vitals).results.len(), expected);
        }

        #[test]
        fn confidence_is_bounded_and_non_increasing(
            symptom in any_symptom(),
            vitals in any_reading(),
        ) {
            let report = catalog().analyze(&symptom, &vitals);
            prop_assert!(report.results.iter().all(|r| r.confidence <= 100));
            prop_assert!(report
                .results
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence));
        }

        #[test]
        fn status_follows_result_count(
            symptom in any_symptom(),
            vitals in any_reading(),
        ) {
            let report = catalog().analyze(&symptom, &vitals);
            let expected = match report.results.len() {
                0 => DiagnosisStatus::Unknown,
                1 => DiagnosisStatus::Confirmed,
                _ => DiagnosisStatus::Multiple,
            };
            prop_assert_eq!(report.status, expected);
        }

        #[test]
        fn dimension_score_stays_in_unit_interval(
            min in -100.0..100.0f64,
            width in 0.01..50.0f64,
            value in -200.0..200.0f64,
        ) {
            let score = dimension_score(VitalRange::new(min, min + width), value);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
