//! Types shared by the diagnosis catalog and the analysis engine.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Vital ranges
// ═══════════════════════════════════════════════════════════

/// Closed interval `[min, max]` of acceptable values for one vital sign.
///
/// Serialised as a two-element array, the shape operators write in
/// catalog files: `"temp": [38.0, 39.2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct VitalRange {
    pub min: f64,
    pub max: f64,
}

impl VitalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.max - self.min) / 2.0
    }
}

impl From<[f64; 2]> for VitalRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<VitalRange> for [f64; 2] {
    fn from(range: VitalRange) -> Self {
        [range.min, range.max]
    }
}

/// The four measured dimensions, in scoring order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalKind {
    Temperature,
    HeartRate,
    OxygenSaturation,
    BloodPressure,
}

impl VitalKind {
    pub const ALL: [VitalKind; 4] = [
        VitalKind::Temperature,
        VitalKind::HeartRate,
        VitalKind::OxygenSaturation,
        VitalKind::BloodPressure,
    ];

    /// Field name used on the wire and in catalog files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temp",
            Self::HeartRate => "hr",
            Self::OxygenSaturation => "o2",
            Self::BloodPressure => "bp",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Disease profiles
// ═══════════════════════════════════════════════════════════

/// One entry of the differential diagnosis table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub name: String,
    pub symptoms: Vec<String>,
    #[serde(rename = "temp")]
    pub temperature: VitalRange,
    #[serde(rename = "hr")]
    pub heart_rate: VitalRange,
    #[serde(rename = "o2")]
    pub oxygen_saturation: VitalRange,
    #[serde(rename = "bp")]
    pub blood_pressure: VitalRange,
    #[serde(rename = "organ")]
    pub target_organ: String,
    #[serde(rename = "med")]
    pub recommended_medication: String,
    #[serde(rename = "desc")]
    pub description: String,
}

impl DiseaseProfile {
    pub fn range(&self, kind: VitalKind) -> VitalRange {
        match kind {
            VitalKind::Temperature => self.temperature,
            VitalKind::HeartRate => self.heart_rate,
            VitalKind::OxygenSaturation => self.oxygen_saturation,
            VitalKind::BloodPressure => self.blood_pressure,
        }
    }

    pub fn has_symptom(&self, symptom: &str) -> bool {
        self.symptoms.iter().any(|s| s == symptom)
    }
}

// ═══════════════════════════════════════════════════════════
// Readings and results
// ═══════════════════════════════════════════════════════════

/// The four measurements taken on a patient for one analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalReading {
    pub temperature: f64,
    pub heart_rate: f64,
    pub oxygen_saturation: f64,
    pub blood_pressure: f64,
}

impl VitalReading {
    pub fn value(&self, kind: VitalKind) -> f64 {
        match kind {
            VitalKind::Temperature => self.temperature,
            VitalKind::HeartRate => self.heart_rate,
            VitalKind::OxygenSaturation => self.oxygen_saturation,
            VitalKind::BloodPressure => self.blood_pressure,
        }
    }
}

/// A surviving profile with its proximity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    #[serde(flatten)]
    pub profile: DiseaseProfile,
    /// 0–100, higher means closer to the profile's ideal values.
    pub confidence: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    /// No profile survived elimination.
    Unknown,
    /// Exactly one profile survived.
    Confirmed,
    /// Several profiles survived; see `results` for the ranking.
    Multiple,
}

impl DiagnosisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Confirmed => "confirmed",
            Self::Multiple => "multiple",
        }
    }
}

/// Outcome of one analysis. `results` is empty, never absent, on `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub status: DiagnosisStatus,
    pub message: String,
    pub results: Vec<DiagnosisResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = VitalRange::new(95.0, 110.0);
        assert!(range.contains(95.0));
        assert!(range.contains(110.0));
        assert!(range.contains(102.5));
        assert!(!range.contains(94.999));
        assert!(!range.contains(110.001));
    }

    #[test]
    fn range_midpoint_and_half_width() {
        let range = VitalRange::new(110.0, 125.0);
        assert_eq!(range.midpoint(), 117.5);
        assert_eq!(range.half_width(), 7.5);
    }

    #[test]
    fn profile_uses_short_wire_names() {
        let json = r#"{
            "name": "Arthrite",
            "symptoms": ["Boiter (Limping)"],
            "temp": [37.5, 38.5], "hr": [80, 95], "o2": [95, 98], "bp": [115, 130],
            "organ": "Jambe", "med": "Dexaméthasone", "desc": "Inflammation articulaire sévère."
        }"#;
        let profile: DiseaseProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.heart_rate, VitalRange::new(80.0, 95.0));
        assert_eq!(profile.target_organ, "Jambe");

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["bp"], serde_json::json!([115.0, 130.0]));
        assert_eq!(back["med"], "Dexaméthasone");
    }

    #[test]
    fn result_flattens_profile_fields() {
        let profile = DiseaseProfile {
            name: "Gastrite".into(),
            symptoms: vec!["Vomissement".into()],
            temperature: VitalRange::new(37.5, 38.5),
            heart_rate: VitalRange::new(90.0, 100.0),
            oxygen_saturation: VitalRange::new(93.0, 97.0),
            blood_pressure: VitalRange::new(110.0, 125.0),
            target_organ: "Estomac".into(),
            recommended_medication: "Dexaméthasone".into(),
            description: "Inflammation de la muqueuse de l'estomac.".into(),
        };
        let json = serde_json::to_value(DiagnosisResult {
            profile,
            confidence: 42,
        })
        .unwrap();
        assert_eq!(json["name"], "Gastrite");
        assert_eq!(json["confidence"], 42);
        assert_eq!(json["organ"], "Estomac");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(DiagnosisStatus::Multiple).unwrap(),
            "multiple"
        );
        assert_eq!(DiagnosisStatus::Confirmed.as_str(), "confirmed");
    }
}
