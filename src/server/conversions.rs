use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rmcp::{ErrorData as McpError, model::*};
use serde::Serialize;
use uuid::Uuid;

use crate::availability::timezone::TimezoneAdapter;
use crate::availability::{AvailabilityOutcome, DayAvailability};
use crate::booking::EstablishmentData;
use crate::booking::model::{
    Appointment, AppointmentId, AppointmentStatus, ClientId, Establishment, EstablishmentId,
    Professional, ProfessionalId, RecordStatus, Service, ServiceId, Shift, ShiftId, WeekdaySet,
    WindowId, WorkingWindow,
};
use crate::error::AgendaError;
use super::types::{
    AppointmentInput, LoadEstablishmentParams, ProfessionalInput, ServiceInput, ShiftInput,
    WorkingWindowInput,
};

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AgendaError> {
    // Try RFC 3339 first (with timezone offset)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Try without timezone (assume UTC)
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    Err(AgendaError::InvalidInput(format!(
        "Cannot parse datetime: '{}'. Use ISO 8601 format.",
        s
    )))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AgendaError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        AgendaError::InvalidInput(format!("Cannot parse date: '{}'. Use YYYY-MM-DD.", s))
    })
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, AgendaError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| {
        AgendaError::InvalidInput(format!("Cannot parse time: '{}'. Use HH:MM.", s))
    })
}

pub(crate) fn parse_uuid(s: &str, kind: &str) -> Result<Uuid, AgendaError> {
    Uuid::parse_str(s.trim())
        .map_err(|e| AgendaError::InvalidInput(format!("Invalid {kind} ID '{s}': {e}")))
}

/// Parse an optional ID, generating a fresh one when absent.
fn uuid_or_new(s: Option<&str>, kind: &str) -> Result<Uuid, AgendaError> {
    s.map_or_else(|| Ok(Uuid::new_v4()), |s| parse_uuid(s, kind))
}

fn record_status(active: Option<bool>) -> RecordStatus {
    if active.unwrap_or(true) {
        RecordStatus::Active
    } else {
        RecordStatus::Inactive
    }
}

fn appointment_status(s: Option<&str>) -> Result<AppointmentStatus, AgendaError> {
    match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("active") => Ok(AppointmentStatus::Active),
        Some("completed") => Ok(AppointmentStatus::Completed),
        Some("canceled") | Some("cancelled") => Ok(AppointmentStatus::Canceled),
        Some(other) => Err(AgendaError::InvalidInput(format!(
            "Unknown appointment status: '{other}'"
        ))),
    }
}

fn service_ids(ids: &[String]) -> Result<std::collections::BTreeSet<ServiceId>, AgendaError> {
    ids.iter()
        .map(|id| parse_uuid(id, "service").map(ServiceId))
        .collect()
}

fn service_from_input(input: &ServiceInput, establishment_id: EstablishmentId) -> Result<Service, AgendaError> {
    Ok(Service {
        id: ServiceId(uuid_or_new(input.id.as_deref(), "service")?),
        establishment_id,
        name: input.name.clone(),
        duration: parse_time(&input.duration)?,
        status: record_status(input.active),
    })
}

fn professional_from_input(
    input: &ProfessionalInput,
    establishment_id: EstablishmentId,
) -> Result<Professional, AgendaError> {
    Ok(Professional {
        id: ProfessionalId(uuid_or_new(input.id.as_deref(), "professional")?),
        establishment_id,
        name: input.name.clone(),
        service_ids: service_ids(&input.service_ids)?,
        status: record_status(input.active),
    })
}

fn window_from_input(
    input: &WorkingWindowInput,
    establishment_id: EstablishmentId,
) -> Result<WorkingWindow, AgendaError> {
    let professional_id = input
        .professional_id
        .as_deref()
        .map(|id| parse_uuid(id, "professional").map(ProfessionalId))
        .transpose()?;
    Ok(WorkingWindow {
        id: WindowId(uuid_or_new(input.id.as_deref(), "working window")?),
        establishment_id,
        professional_id,
        weekdays: WeekdaySet::from_numbers(&input.weekdays)?,
        start: parse_time(&input.start)?,
        end: parse_time(&input.end)?,
        service_ids: service_ids(input.service_ids.as_deref().unwrap_or_default())?,
        status: record_status(input.active),
    })
}

fn shift_from_input(input: &ShiftInput, establishment_id: EstablishmentId) -> Result<Shift, AgendaError> {
    Ok(Shift {
        id: ShiftId(uuid_or_new(input.id.as_deref(), "shift")?),
        establishment_id,
        name: input.name.clone(),
        weekdays: WeekdaySet::from_numbers(&input.weekdays)?,
        start: parse_time(&input.start)?,
        end: parse_time(&input.end)?,
        status: record_status(input.active),
    })
}

fn appointment_from_input(
    input: &AppointmentInput,
    establishment_id: EstablishmentId,
) -> Result<Appointment, AgendaError> {
    Ok(Appointment {
        id: AppointmentId(uuid_or_new(input.id.as_deref(), "appointment")?),
        establishment_id,
        professional_id: ProfessionalId(parse_uuid(&input.professional_id, "professional")?),
        service_id: ServiceId(parse_uuid(&input.service_id, "service")?),
        client_id: ClientId(uuid_or_new(input.client_id.as_deref(), "client")?),
        start: parse_datetime(&input.start)?,
        duration_minutes: input.duration_minutes,
        status: appointment_status(input.status.as_deref())?,
    })
}

/// Convert a tool document into store records, all owned by one establishment.
pub(crate) fn document_to_data(doc: &LoadEstablishmentParams) -> Result<EstablishmentData, AgendaError> {
    let id = EstablishmentId(uuid_or_new(doc.id.as_deref(), "establishment")?);

    Ok(EstablishmentData {
        establishment: Establishment {
            id,
            name: doc.name.clone(),
        },
        services: doc
            .services
            .iter()
            .map(|s| service_from_input(s, id))
            .collect::<Result<_, _>>()?,
        professionals: doc
            .professionals
            .iter()
            .map(|p| professional_from_input(p, id))
            .collect::<Result<_, _>>()?,
        windows: doc
            .working_windows
            .iter()
            .map(|w| window_from_input(w, id))
            .collect::<Result<_, _>>()?,
        shifts: doc
            .shifts
            .iter()
            .flatten()
            .map(|s| shift_from_input(s, id))
            .collect::<Result<_, _>>()?,
        appointments: doc
            .appointments
            .iter()
            .flatten()
            .map(|a| appointment_from_input(a, id))
            .collect::<Result<_, _>>()?,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct AvailabilityView<'a> {
    pub(crate) outcome: &'static str,
    pub(crate) days: &'a [DayAvailability],
}

impl<'a> From<&'a AvailabilityOutcome> for AvailabilityView<'a> {
    fn from(outcome: &'a AvailabilityOutcome) -> Self {
        Self {
            outcome: if outcome.is_partial() { "partial" } else { "complete" },
            days: outcome.days(),
        }
    }
}

/// An appointment as tools report it: local date and times next to the
/// storage instant.
#[derive(Debug, Serialize)]
pub(crate) struct AppointmentView {
    pub(crate) appointment_id: String,
    pub(crate) professional_id: String,
    pub(crate) service_id: String,
    pub(crate) client_id: String,
    pub(crate) date: String,
    pub(crate) start: String,
    pub(crate) end: String,
    pub(crate) starts_at: String,
    pub(crate) duration_minutes: u32,
    pub(crate) status: AppointmentStatus,
}

pub(crate) fn appointment_view(appointment: &Appointment, tz: &TimezoneAdapter) -> AppointmentView {
    let start = tz.to_local(appointment.start);
    let end = tz.to_local(appointment.end());
    AppointmentView {
        appointment_id: appointment.id.to_string(),
        professional_id: appointment.professional_id.to_string(),
        service_id: appointment.service_id.to_string(),
        client_id: appointment.client_id.to_string(),
        date: start.date().format("%Y-%m-%d").to_string(),
        start: start.time().format("%H:%M").to_string(),
        end: end.time().format("%H:%M").to_string(),
        starts_at: appointment.start.to_rfc3339(),
        duration_minutes: appointment.duration_minutes,
        status: appointment.status,
    }
}

pub(crate) fn agenda_err(e: AgendaError) -> McpError {
    let code = match &e {
        AgendaError::NotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
        AgendaError::UpstreamReadFailure(_) | AgendaError::Internal(_) => ErrorCode::INTERNAL_ERROR,
        _ => ErrorCode::INVALID_PARAMS,
    };
    McpError::new(code, e.to_string(), None::<serde_json::Value>)
}

pub(crate) fn json_text<T: Serialize>(value: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string());
    CallToolResult::success(vec![Content::text(json)])
}
