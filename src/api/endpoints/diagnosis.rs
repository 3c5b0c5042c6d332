//! Differential diagnosis endpoints.
//!
//! - `GET /api/diagnosis/symptoms`: sorted visible-symptom list
//! - `POST /api/diagnosis/analyze`: eliminate and rank disease profiles

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Caller};
use crate::diagnosis::{AnalyzeRequest, DiagnosisReport};

pub async fn symptoms(State(ctx): State<ApiContext>, _caller: Caller) -> Json<Vec<String>> {
    Json(ctx.core.catalog().list_symptoms().to_vec())
}

pub async fn analyze(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<DiagnosisReport>, ApiError> {
    let Json(request) = payload?;
    let (symptom, vitals) = request.into_parts()?;

    let report = ctx.core.catalog().analyze(&symptom, &vitals);
    tracing::debug!(
        user_id = identity.user_id(),
        symptom = %symptom,
        status = report.status.as_str(),
        matches = report.results.len(),
        "Diagnosis analyzed"
    );
    Ok(Json(report))
}
