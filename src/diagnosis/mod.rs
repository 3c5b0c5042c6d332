//! Differential diagnosis engine.
//!
//! Maps one reported symptom plus four vital signs to a ranked list of
//! plausible diseases from a static catalog. Range containment is a hard
//! constraint; closeness to each range's midpoint only ranks survivors.

pub mod catalog;
pub mod engine;
pub mod types;

pub use catalog::{CatalogError, DiseaseCatalog};
pub use engine::{AnalyzeRequest, RawVitals};
pub use types::{
    DiagnosisReport, DiagnosisResult, DiagnosisStatus, DiseaseProfile, VitalKind, VitalRange,
    VitalReading,
};

/// Errors from the diagnosis layer.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
