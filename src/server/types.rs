use schemars::JsonSchema;
use serde::Deserialize;

// -- Establishment document --

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ServiceInput {
    #[schemars(description = "Service ID (UUID). Generated when omitted.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Service name")]
    pub(crate) name: String,
    #[schemars(description = "Duration as a time of day 'HH:MM' (e.g. '01:00' for one hour)")]
    pub(crate) duration: String,
    #[schemars(description = "Whether the service is active. Defaults to true.")]
    pub(crate) active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ProfessionalInput {
    #[schemars(description = "Professional ID (UUID). Generated when omitted.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Professional name")]
    pub(crate) name: String,
    #[schemars(description = "IDs of the services this professional offers")]
    pub(crate) service_ids: Vec<String>,
    #[schemars(description = "Whether the professional is active. Defaults to true.")]
    pub(crate) active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct WorkingWindowInput {
    #[schemars(description = "Working window ID (UUID). Generated when omitted.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Owning professional ID. Omit for an establishment-wide window.")]
    pub(crate) professional_id: Option<String>,
    #[schemars(description = "Weekdays the window applies to, 0 = Sunday through 6 = Saturday")]
    pub(crate) weekdays: Vec<u8>,
    #[schemars(description = "Opening time 'HH:MM'")]
    pub(crate) start: String,
    #[schemars(description = "Closing time 'HH:MM'. Must be after start.")]
    pub(crate) end: String,
    #[schemars(description = "Service IDs this window is restricted to. Empty or omitted means every service.")]
    pub(crate) service_ids: Option<Vec<String>>,
    #[schemars(description = "Whether the window is active. Defaults to true.")]
    pub(crate) active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ShiftInput {
    #[schemars(description = "Shift ID (UUID). Generated when omitted.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Shift name (e.g. 'Morning')")]
    pub(crate) name: String,
    #[schemars(description = "Weekdays the shift applies to, 0 = Sunday through 6 = Saturday")]
    pub(crate) weekdays: Vec<u8>,
    #[schemars(description = "Shift start 'HH:MM'")]
    pub(crate) start: String,
    #[schemars(description = "Shift end 'HH:MM'. Must be after start.")]
    pub(crate) end: String,
    #[schemars(description = "Whether the shift is active. Defaults to true.")]
    pub(crate) active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct AppointmentInput {
    #[schemars(description = "Appointment ID (UUID). Generated when omitted.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Professional ID")]
    pub(crate) professional_id: String,
    #[schemars(description = "Service ID")]
    pub(crate) service_id: String,
    #[schemars(description = "Client ID. Generated when omitted.")]
    pub(crate) client_id: Option<String>,
    #[schemars(description = "Start instant in storage time (ISO 8601, e.g. '2025-01-06T12:00:00Z')")]
    pub(crate) start: String,
    #[schemars(description = "Duration in minutes")]
    pub(crate) duration_minutes: u32,
    #[schemars(description = "One of 'active', 'completed', 'canceled'. Defaults to 'active'.")]
    pub(crate) status: Option<String>,
}

// -- Tool parameter structs --

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct LoadEstablishmentParams {
    #[schemars(description = "Establishment ID (UUID). Generated when omitted; loading an existing ID replaces it.")]
    pub(crate) id: Option<String>,
    #[schemars(description = "Establishment name")]
    pub(crate) name: String,
    #[schemars(description = "Services offered by the establishment")]
    pub(crate) services: Vec<ServiceInput>,
    #[schemars(description = "Professionals working at the establishment")]
    pub(crate) professionals: Vec<ProfessionalInput>,
    #[schemars(description = "Weekly working windows")]
    pub(crate) working_windows: Vec<WorkingWindowInput>,
    #[schemars(description = "Operating shifts. When a weekday has shifts, only times inside them are offered.")]
    pub(crate) shifts: Option<Vec<ShiftInput>>,
    #[schemars(description = "Existing appointments")]
    pub(crate) appointments: Option<Vec<AppointmentInput>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ResolveAvailabilityParams {
    #[schemars(description = "Establishment ID")]
    pub(crate) establishment_id: String,
    #[schemars(description = "Service ID")]
    pub(crate) service_id: String,
    #[schemars(description = "Professional ID. Omit to resolve for the whole establishment.")]
    pub(crate) professional_id: Option<String>,
    #[schemars(description = "First local date to scan 'YYYY-MM-DD'. Defaults to today.")]
    pub(crate) from_date: Option<String>,
    #[schemars(description = "Tick size in minutes; must divide a day evenly. Defaults to the server setting.")]
    pub(crate) tick_minutes: Option<u32>,
    #[schemars(description = "Overall scan deadline in milliseconds. Days computed before it are returned as a partial result.")]
    pub(crate) deadline_ms: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct BookAppointmentParams {
    #[schemars(description = "Establishment ID")]
    pub(crate) establishment_id: String,
    #[schemars(description = "Professional ID")]
    pub(crate) professional_id: String,
    #[schemars(description = "Service ID")]
    pub(crate) service_id: String,
    #[schemars(description = "Client ID. Generated when omitted.")]
    pub(crate) client_id: Option<String>,
    #[schemars(description = "Local date 'YYYY-MM-DD'")]
    pub(crate) date: String,
    #[schemars(description = "Local start time 'HH:MM', as returned by resolve_availability")]
    pub(crate) start: String,
    #[schemars(description = "Tick size in minutes used for the re-check. Defaults to the server setting.")]
    pub(crate) tick_minutes: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct AppointmentIdParams {
    #[schemars(description = "The appointment ID")]
    pub(crate) appointment_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ListAppointmentsParams {
    #[schemars(description = "Establishment ID")]
    pub(crate) establishment_id: String,
    #[schemars(description = "Professional ID. If omitted, lists every professional.")]
    pub(crate) professional_id: Option<String>,
    #[schemars(description = "Local date 'YYYY-MM-DD'")]
    pub(crate) date: String,
}
