use super::{blocking, ApiError, ApiResponse, AppState, CurrentCaller};
use crate::analytics::DoctorAnalytics;
use crate::models::{Diagnosis, Vitals};
use crate::records::{DiagnosisUpdate, NewDiagnosis};
use crate::views::Detailed;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_diagnoses).post(create_diagnosis))
        .route("/ai/analysis", post(analyse))
        .route("/analytics/doctor", get(doctor_analytics))
        .route("/:id", get(get_diagnosis).patch(update_diagnosis))
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisBody {
    symptoms: Option<String>,
    vitals: Option<Vitals>,
}

#[derive(Debug, Serialize)]
struct AnalysisResult {
    analysis: String,
}

async fn create_diagnosis(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<NewDiagnosis>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Diagnosis>>, ApiError> {
    let Json(input) = payload?;
    let clinic = state.clinic;
    let diagnosis = blocking(move || {
        let diagnosis = clinic.records.create_diagnosis(&caller, input)?;
        clinic.detailed(diagnosis)
    })
    .await?;
    Ok(ApiResponse::created(diagnosis, "Diagnosis created successfully"))
}

async fn list_diagnoses(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<ApiResponse<Vec<Detailed<Diagnosis>>>, ApiError> {
    let clinic = state.clinic;
    let diagnoses = blocking(move || {
        let diagnoses = clinic.records.list_diagnoses(&caller)?;
        clinic.detailed_all(diagnoses)
    })
    .await?;
    Ok(ApiResponse::ok(diagnoses, "Diagnosis history retrieved successfully"))
}

async fn get_diagnosis(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Detailed<Diagnosis>>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    let diagnosis = blocking(move || {
        let diagnosis = clinic.records.get_diagnosis(&caller, id)?;
        clinic.detailed(diagnosis)
    })
    .await?;
    Ok(ApiResponse::ok(diagnosis, "Diagnosis retrieved successfully"))
}

async fn update_diagnosis(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<DiagnosisUpdate>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Diagnosis>>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let clinic = state.clinic;
    let diagnosis = blocking(move || {
        let diagnosis = clinic.records.update_diagnosis(&caller, id, update)?;
        clinic.detailed(diagnosis)
    })
    .await?;
    Ok(ApiResponse::ok(diagnosis, "Diagnosis updated successfully"))
}

/// Stateless advisory text. Any signed-in caller may ask.
async fn analyse(
    State(state): State<AppState>,
    CurrentCaller(_): CurrentCaller,
    payload: Result<Json<AnalysisBody>, JsonRejection>,
) -> Result<ApiResponse<AnalysisResult>, ApiError> {
    let Json(body) = payload?;
    let analysis = state
        .clinic
        .records
        .analyse(body.symptoms.as_deref(), body.vitals.as_ref());
    Ok(ApiResponse::ok(
        AnalysisResult { analysis },
        "AI analysis generated successfully",
    ))
}

async fn doctor_analytics(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<ApiResponse<DoctorAnalytics>, ApiError> {
    let clinic = state.clinic;
    let analytics = blocking(move || clinic.doctor_analytics(&caller)).await?;
    Ok(ApiResponse::ok(analytics, "Analytics retrieved successfully"))
}
