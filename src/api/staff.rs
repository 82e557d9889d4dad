use super::{blocking, ApiError, ApiResponse, AppState, CurrentCaller};
use crate::db::directory::DoctorQuery;
use crate::models::{DoctorListing, StaffStatus};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/doctors", get(list_doctors))
}

#[derive(Debug, Deserialize)]
struct DoctorsQuery {
    specialization: Option<String>,
    /// Defaults to `active`, the doctors who can be booked.
    status: Option<StaffStatus>,
}

async fn list_doctors(
    State(state): State<AppState>,
    CurrentCaller(_): CurrentCaller,
    query: Result<Query<DoctorsQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<DoctorListing>>, ApiError> {
    let Query(query) = query?;
    let query = DoctorQuery {
        specialization: query.specialization,
        status: Some(query.status.unwrap_or_default()),
    };
    let clinic = state.clinic;
    let doctors = blocking(move || clinic.doctors(&query)).await?;
    Ok(ApiResponse::ok(doctors, "Doctors retrieved successfully"))
}
