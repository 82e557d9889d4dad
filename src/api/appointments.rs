use super::{blocking, ApiError, ApiResponse, AppState, CurrentCaller};
use crate::appointments::{AppointmentFilter, BookingRequest};
use crate::error::ClinicError;
use crate::models::{parse_day, Appointment, AppointmentStatus, Role};
use crate::slots::TimeSlot;
use crate::views::Detailed;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments))
        .route("/book", post(book_appointment))
        .route("/available-slots", get(available_slots))
        .route("/:id", get(get_appointment))
        .route("/:id/status", patch(update_status))
        .route("/:id/cancel", post(cancel_appointment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookBody {
    /// Patients book for themselves and may leave this out.
    patient_id: Option<i64>,
    doctor_id: i64,
    appointment_date: String,
    time_slot: TimeSlot,
    reason: Option<String>,
    symptoms: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotsQuery {
    doctor_id: i64,
    date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotsBody {
    available_slots: Vec<TimeSlot>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<AppointmentStatus>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: AppointmentStatus,
}

async fn book_appointment(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    payload: Result<Json<BookBody>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Appointment>>, ApiError> {
    let Json(body) = payload?;
    let patient_id = match (body.patient_id, caller.role) {
        (Some(id), _) => id,
        (None, Role::Patient) => caller.id,
        (None, _) => return Err(ClinicError::validation("patientId is required").into()),
    };
    let request = BookingRequest {
        patient_id,
        doctor_id: body.doctor_id,
        day: parse_day(&body.appointment_date)?,
        time_slot: body.time_slot,
        reason: body.reason,
        symptoms: body.symptoms,
    };

    let clinic = state.clinic;
    let booked = blocking(move || {
        let appointment = clinic.appointments.book(&caller, request)?;
        clinic.detailed(appointment)
    })
    .await?;
    Ok(ApiResponse::created(booked, "Appointment booked successfully"))
}

async fn available_slots(
    State(state): State<AppState>,
    CurrentCaller(_): CurrentCaller,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<ApiResponse<SlotsBody>, ApiError> {
    let Query(query) = query?;
    let day = parse_day(&query.date)?;

    let clinic = state.clinic;
    let available_slots =
        blocking(move || clinic.appointments.available_slots(query.doctor_id, day)).await?;
    Ok(ApiResponse::ok(
        SlotsBody { available_slots },
        "Available slots retrieved successfully",
    ))
}

async fn list_appointments(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<Detailed<Appointment>>>, ApiError> {
    let Query(query) = query?;
    let filter = AppointmentFilter {
        status: query.status,
        day: query.date.as_deref().map(parse_day).transpose()?,
    };

    let clinic = state.clinic;
    let appointments = blocking(move || {
        let appointments = clinic.appointments.list(&caller, filter)?;
        clinic.detailed_all(appointments)
    })
    .await?;
    Ok(ApiResponse::ok(appointments, "Appointments retrieved successfully"))
}

async fn get_appointment(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Detailed<Appointment>>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    let appointment = blocking(move || {
        let appointment = clinic.appointments.get(&caller, id)?;
        clinic.detailed(appointment)
    })
    .await?;
    Ok(ApiResponse::ok(appointment, "Appointment retrieved successfully"))
}

async fn update_status(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> Result<ApiResponse<Detailed<Appointment>>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let clinic = state.clinic;
    let appointment = blocking(move || {
        let appointment = clinic.appointments.update_status(&caller, id, body.status)?;
        clinic.detailed(appointment)
    })
    .await?;
    Ok(ApiResponse::ok(appointment, "Appointment status updated"))
}

async fn cancel_appointment(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Detailed<Appointment>>, ApiError> {
    let Path(id) = id?;
    let clinic = state.clinic;
    let appointment = blocking(move || {
        let appointment = clinic.appointments.cancel(&caller, id)?;
        clinic.detailed(appointment)
    })
    .await?;
    Ok(ApiResponse::ok(appointment, "Appointment cancelled successfully"))
}
