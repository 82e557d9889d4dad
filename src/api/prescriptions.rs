use super::{blocking, ApiError, ApiResponse, AppState, CurrentCaller};
use crate::advisory::MedicineReference;
use crate::models::{Prescription, PrescriptionStatus};
use crate::records::{NewPrescription, PrescriptionUpdate};
use crate::views::Detailed;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_prescriptions).post(create_prescription))
        .route("/search/medicines", get(search_medicines))
        .route(
            "/:id",
            get(get_prescription)
                .patch(update_prescription)
                .delete(delete_prescription),
        )
        .route("/:id/pdf", get(prescription_pdf))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<PrescriptionStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PdfLink {
    pdf_url: String,
}

async fn create_prescription(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<NewPrescription>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Prescription>>, ApiError> {
    let Json(input) = payload?;
    let clinic = state.clinic;
    let prescription = blocking(move || {
        let prescription = clinic.records.create_prescription(&caller, input)?;
        clinic.detailed(prescription)
    })
    .await?;
    Ok(ApiResponse::created(prescription, "Prescription created successfully"))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<Detailed<Prescription>>>, ApiError> {
    let Query(query) = query?;
    let clinic = state.clinic;
    let prescriptions = blocking(move || {
        let prescriptions = clinic.records.list_prescriptions(&caller, query.status)?;
        clinic.detailed_all(prescriptions)
    })
    .await?;
    Ok(ApiResponse::ok(prescriptions, "Prescriptions retrieved successfully"))
}

async fn get_prescription(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Detailed<Prescription>>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    let prescription = blocking(move || {
        let prescription = clinic.records.get_prescription(&caller, id)?;
        clinic.detailed(prescription)
    })
    .await?;
    Ok(ApiResponse::ok(prescription, "Prescription retrieved successfully"))
}

async fn update_prescription(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PrescriptionUpdate>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Prescription>>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let clinic = state.clinic;
    let prescription = blocking(move || {
        let prescription = clinic.records.update_prescription(&caller, id, update)?;
        clinic.detailed(prescription)
    })
    .await?;
    Ok(ApiResponse::ok(prescription, "Prescription updated successfully"))
}

async fn delete_prescription(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    blocking(move || clinic.records.delete_prescription(&caller, id)).await?;
    Ok(ApiResponse::ok((), "Prescription deleted successfully"))
}

async fn search_medicines(
    State(state): State<AppState>,
    CurrentCaller(_): CurrentCaller,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<MedicineReference>>, ApiError> {
    let Query(query) = query?;
    let medicines = state.clinic.records.search_medicines(&query.query);
    Ok(ApiResponse::ok(medicines, "Medicines retrieved successfully"))
}

async fn prescription_pdf(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<PdfLink>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    let base_url = state.public_base_url;
    let pdf_url =
        blocking(move || clinic.records.prescription_pdf_url(&caller, id, &base_url)).await?;
    Ok(ApiResponse::ok(PdfLink { pdf_url }, "PDF generated successfully"))
}
