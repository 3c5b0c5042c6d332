//! Disease catalog: the static reference table the engine filters.
//!
//! A catalog is validated once when it is built and never mutated after.
//! Zero-width ranges are rejected here so scoring never divides by zero.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use super::types::{DiseaseProfile, VitalKind, VitalRange};

/// Reasons a catalog is refused at load time.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog contains no disease profiles")]
    Empty,
    #[error("Disease profile #{index} has an empty name")]
    EmptyName { index: usize },
    #[error("Duplicate disease profile name: {0}")]
    DuplicateName(String),
    #[error("Disease '{0}' declares no symptoms")]
    NoSymptoms(String),
    #[error("Disease '{0}' declares a blank symptom")]
    BlankSymptom(String),
    #[error("Disease '{disease}': {vital} range has a non-finite bound")]
    NonFiniteBound { disease: String, vital: &'static str },
    #[error("Disease '{disease}': {vital} range [{min}, {max}] must satisfy min < max")]
    InvalidRange {
        disease: String,
        vital: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Validated, ordered set of disease profiles.
#[derive(Debug, Clone)]
pub struct DiseaseCatalog {
    profiles: Vec<DiseaseProfile>,
    symptoms: Vec<String>,
}

impl DiseaseCatalog {
    /// Build a catalog, rejecting malformed profiles.
    ///
    /// Profile order is kept: it is the tie-break order of analysis results.
    pub fn new(profiles: Vec<DiseaseProfile>) -> Result<Self, CatalogError> {
        if profiles.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        for (index, profile) in profiles.iter().enumerate() {
            validate_profile(index, profile)?;
            if !names.insert(profile.name.as_str()) {
                return Err(CatalogError::DuplicateName(profile.name.clone()));
            }
        }

        let symptoms = profiles
            .iter()
            .flat_map(|p| p.symptoms.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self { profiles, symptoms })
    }

    /// Load an operator-supplied catalog: a JSON array of profiles.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: Vec<DiseaseProfile> = serde_json::from_str(&raw)?;
        let catalog = Self::new(profiles)?;
        tracing::info!(
            path = %path.display(),
            profiles = catalog.len(),
            "Loaded disease catalog from file"
        );
        Ok(catalog)
    }

    /// The reference table shipped with the terminal.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_profiles())
    }

    pub fn profiles(&self) -> &[DiseaseProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Every distinct symptom across the catalog, sorted ascending.
    pub fn list_symptoms(&self) -> &[String] {
        &self.symptoms
    }
}

fn validate_profile(index: usize, profile: &DiseaseProfile) -> Result<(), CatalogError> {
    if profile.name.trim().is_empty() {
        return Err(CatalogError::EmptyName { index });
    }
    if profile.symptoms.is_empty() {
        return Err(CatalogError::NoSymptoms(profile.name.clone()));
    }
    if profile.symptoms.iter().any(|s| s.trim().is_empty()) {
        return Err(CatalogError::BlankSymptom(profile.name.clone()));
    }

    for kind in VitalKind::ALL {
        let range = profile.range(kind);
        if !range.min.is_finite() || !range.max.is_finite() {
            return Err(CatalogError::NonFiniteBound {
                disease: profile.name.clone(),
                vital: kind.as_str(),
            });
        }
        if range.min >= range.max {
            return Err(CatalogError::InvalidRange {
                disease: profile.name.clone(),
                vital: kind.as_str(),
                min: range.min,
                max: range.max,
            });
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Built-in table
// ═══════════════════════════════════════════════════════════

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    symptoms: &[&str],
    temp: [f64; 2],
    hr: [f64; 2],
    o2: [f64; 2],
    bp: [f64; 2],
    organ: &str,
    med: &str,
    desc: &str,
) -> DiseaseProfile {
    DiseaseProfile {
        name: name.to_string(),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        temperature: VitalRange::from(temp),
        heart_rate: VitalRange::from(hr),
        oxygen_saturation: VitalRange::from(o2),
        blood_pressure: VitalRange::from(bp),
        target_organ: organ.to_string(),
        recommended_medication: med.to_string(),
        description: desc.to_string(),
    }
}

fn builtin_profiles() -> Vec<DiseaseProfile> {
    vec![
        profile(
            "Virus Respiratoire",
            &["Toux", "Eternuement"],
            [38.0, 39.2], [95.0, 110.0], [82.0, 90.0], [110.0, 125.0],
            "Poumons", "Ribavirine",
            "Infection virale causant toux et fièvre.",
        ),
        profile(
            "Pneumonie Bactérienne",
            &["Courte respiration", "Toux"],
            [38.5, 39.8], [111.0, 130.0], [75.0, 85.0], [90.0, 105.0],
            "Poumons", "Céfotaxime",
            "Infection pulmonaire sévère avec forte fièvre.",
        ),
        profile(
            "Hémorragie Interne",
            &["Vomissement"],
            [35.5, 36.8], [120.0, 150.0], [75.0, 88.0], [60.0, 85.0],
            "Foie ou estomac", "Acide Tranexamique",
            "Hémorragie interne grave suite à un traumatisme.",
        ),
        profile(
            "Jambe Cassée",
            &["Boiter (Limping)"],
            [36.0, 37.0], [100.0, 120.0], [95.0, 98.0], [110.0, 125.0],
            "Jambe", "Acide Tranexamique",
            "Fracture suite à un traumatisme à fort impact.",
        ),
        profile(
            "Pneumonie Virale",
            &["Courte respiration", "Toux"],
            [38.5, 39.5], [100.0, 120.0], [78.0, 88.0], [100.0, 115.0],
            "Poumons", "Ribavirine",
            "Inflammation pulmonaire sévère virale.",
        ),
        profile(
            "Méningite Virale",
            &["Titubement"],
            [38.0, 39.0], [105.0, 130.0], [85.0, 92.0], [120.0, 135.0],
            "Cerveau", "Ribavirine",
            "Infection des membranes cérébrales.",
        ),
        profile(
            "Hépatite Virale",
            &["Douleur estomac"],
            [37.8, 38.8], [90.0, 110.0], [88.0, 94.0], [105.0, 120.0],
            "Foie", "Ribavirine",
            "Infection virale causant une inflammation du foie.",
        ),
        profile(
            "Gastro-entérite Virale",
            &["Vomissement", "Douleur estomac"],
            [37.5, 38.5], [95.0, 105.0], [90.0, 95.0], [105.0, 115.0],
            "Estomac", "Ribavirine",
            "Infection virale estomac/intestins.",
        ),
        profile(
            "Septicémie",
            &["Titubement"],
            [39.0, 40.0], [120.0, 140.0], [80.0, 90.0], [70.0, 85.0],
            "Foie ou reins", "Céfotaxime",
            "Infection du sang généralisée.",
        ),
        profile(
            "Méningite Bactérienne",
            &["Titubement", "Courte respiration"],
            [38.8, 39.8], [100.0, 120.0], [88.0, 92.0], [110.0, 125.0],
            "Cerveau", "Céfotaxime",
            "Infection cérébrale grave bactérienne.",
        ),
        profile(
            "Gastro-entérite Bactérienne",
            &["Vomissement"],
            [38.0, 38.8], [95.0, 110.0], [90.0, 95.0], [100.0, 115.0],
            "Estomac", "Céfotaxime",
            "Infection bactérienne estomac.",
        ),
        profile(
            "Arthrite",
            &["Boiter (Limping)"],
            [37.5, 38.5], [80.0, 95.0], [95.0, 98.0], [115.0, 130.0],
            "Jambe", "Dexaméthasone",
            "Inflammation articulaire sévère.",
        ),
        profile(
            "Péritonite",
            &["Douleur estomac"],
            [38.5, 39.2], [95.0, 110.0], [90.0, 95.0], [105.0, 120.0],
            "Estomac ou reins", "Dexaméthasone",
            "Inflammation sévère de la paroi abdominale.",
        ),
        profile(
            "Gastrite",
            &["Vomissement"],
            [37.5, 38.5], [90.0, 100.0], [93.0, 97.0], [110.0, 125.0],
            "Estomac", "Dexaméthasone",
            "Inflammation de la muqueuse de l'estomac.",
        ),
        profile(
            "Blessure par Balle",
            &["Injury (Blessure)"],
            [36.0, 37.0], [115.0, 135.0], [85.0, 92.0], [75.0, 90.0],
            "Estomac ou foie", "Acide Tranexamique",
            "Traumatisme balistique avec hémorragie.",
        ),
        profile(
            "Blessure par Arme Blanche",
            &["Injury (Blessure)"],
            [36.5, 37.2], [120.0, 140.0], [70.0, 85.0], [80.0, 95.0],
            "Estomac ou foie", "Acide Tranexamique",
            "Traumatisme pénétrant thorax/abdomen.",
        ),
    ]
}
