pub mod model;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::availability::horizon::DayPlanner;
use crate::availability::tick::TickGrid;
use crate::availability::timezone::TimezoneAdapter;
use crate::availability::{validate_booking_pair, AvailabilitySource, Snapshot};
use crate::error::AgendaError;
use model::{
    Appointment, AppointmentId, AppointmentStatus, ClientId, Establishment, EstablishmentId,
    Professional, ProfessionalId, Service, ServiceId, Shift, ShiftId, WindowId, WorkingWindow,
};

/// Everything belonging to one establishment, loaded as a unit.
#[derive(Debug, Clone)]
pub struct EstablishmentData {
    pub establishment: Establishment,
    pub services: Vec<Service>,
    pub professionals: Vec<Professional>,
    pub windows: Vec<WorkingWindow>,
    pub shifts: Vec<Shift>,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub establishment_id: EstablishmentId,
    pub services: usize,
    pub professionals: usize,
    pub working_windows: usize,
    pub shifts: usize,
    pub appointments: usize,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub establishment_id: EstablishmentId,
    pub professional_id: ProfessionalId,
    pub service_id: ServiceId,
    pub client_id: ClientId,
    /// Local calendar date and start time.
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub tick_minutes: u32,
}

#[derive(Debug, Default)]
pub struct BookingStore {
    establishments: HashMap<EstablishmentId, Establishment>,
    services: HashMap<ServiceId, Service>,
    professionals: HashMap<ProfessionalId, Professional>,
    windows: HashMap<WindowId, WorkingWindow>,
    shifts: HashMap<ShiftId, Shift>,
    appointments: HashMap<AppointmentId, Appointment>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an establishment with all its records, replacing whatever was
    /// stored for it before. Nothing is written if any record is invalid.
    pub fn load_establishment(&mut self, data: EstablishmentData) -> Result<LoadSummary, AgendaError> {
        validate_establishment_data(&data)?;

        let id = data.establishment.id;
        self.services.retain(|_, s| s.establishment_id != id);
        self.professionals.retain(|_, p| p.establishment_id != id);
        self.windows.retain(|_, w| w.establishment_id != id);
        self.shifts.retain(|_, s| s.establishment_id != id);
        self.appointments.retain(|_, a| a.establishment_id != id);

        let summary = LoadSummary {
            establishment_id: id,
            services: data.services.len(),
            professionals: data.professionals.len(),
            working_windows: data.windows.len(),
            shifts: data.shifts.len(),
            appointments: data.appointments.len(),
        };

        self.establishments.insert(id, data.establishment);
        self.services
            .extend(data.services.into_iter().map(|s| (s.id, s)));
        self.professionals
            .extend(data.professionals.into_iter().map(|p| (p.id, p)));
        self.windows
            .extend(data.windows.into_iter().map(|w| (w.id, w)));
        self.shifts
            .extend(data.shifts.into_iter().map(|s| (s.id, s)));
        self.appointments
            .extend(data.appointments.into_iter().map(|a| (a.id, a)));

        tracing::info!(establishment = %id, "loaded establishment");
        Ok(summary)
    }

    pub fn establishment(&self, id: &EstablishmentId) -> Result<&Establishment, AgendaError> {
        self.establishments
            .get(id)
            .ok_or_else(|| AgendaError::NotFound(format!("Establishment {id}")))
    }

    pub fn service(&self, id: &ServiceId) -> Result<&Service, AgendaError> {
        self.services
            .get(id)
            .ok_or_else(|| AgendaError::NotFound(format!("Service {id}")))
    }

    pub fn professional(&self, id: &ProfessionalId) -> Result<&Professional, AgendaError> {
        self.professionals
            .get(id)
            .ok_or_else(|| AgendaError::NotFound(format!("Professional {id}")))
    }

    pub fn active_windows_on(&self, establishment: &EstablishmentId, weekday: Weekday) -> Vec<WorkingWindow> {
        self.windows
            .values()
            .filter(|w| w.establishment_id == *establishment)
            .filter(|w| w.is_active() && w.weekdays.contains(weekday))
            .cloned()
            .collect()
    }

    pub fn active_shifts_on(&self, establishment: &EstablishmentId, weekday: Weekday) -> Vec<Shift> {
        self.shifts
            .values()
            .filter(|s| s.establishment_id == *establishment)
            .filter(|s| s.is_active() && s.weekdays.contains(weekday))
            .cloned()
            .collect()
    }

    /// Every active shift of the establishment, whatever its weekdays.
    pub fn active_shifts_of(&self, establishment: &EstablishmentId) -> Vec<Shift> {
        self.shifts
            .values()
            .filter(|s| s.establishment_id == *establishment && s.is_active())
            .cloned()
            .collect()
    }

    /// Active appointments whose closed span touches `[from, to)`.
    pub fn active_appointments_between(
        &self,
        establishment: &EstablishmentId,
        professional: Option<&ProfessionalId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Appointment> {
        self.appointments
            .values()
            .filter(|a| a.establishment_id == *establishment && a.is_active())
            .filter(|a| professional.map_or(true, |p| *p == a.professional_id))
            .filter(|a| a.start < to && a.end() >= from)
            .cloned()
            .collect()
    }

    /// Appointments of any status starting on local `date`, ordered by start.
    pub fn appointments_on(
        &self,
        establishment: &EstablishmentId,
        professional: Option<&ProfessionalId>,
        date: NaiveDate,
        tz: &TimezoneAdapter,
    ) -> Vec<Appointment> {
        let (from, to) = tz.storage_bounds(date);
        let mut found: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|a| a.establishment_id == *establishment)
            .filter(|a| professional.map_or(true, |p| *p == a.professional_id))
            .filter(|a| a.start >= from && a.start < to)
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.start, a.id));
        found
    }

    /// Book a start after re-checking it against the current appointments.
    ///
    /// The day is evaluated with the same pipeline as the availability scan,
    /// so a start is accepted only if a fresh scan would have offered it.
    pub fn book_appointment(
        &mut self,
        request: &BookingRequest,
        tz: &TimezoneAdapter,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AgendaError> {
        let grid = TickGrid::new(request.tick_minutes)?;
        let establishment = self.establishment(&request.establishment_id)?;
        let service = self.service(&request.service_id)?;
        let professional = self.professional(&request.professional_id)?;
        let duration = validate_booking_pair(establishment, service, Some(professional))?;
        if grid.time_of(grid.index_of(request.start)) != request.start {
            return Err(AgendaError::InvalidInput(format!(
                "Start {} is not on the {}-minute grid",
                request.start.format("%H:%M"),
                grid.size_minutes()
            )));
        }

        let start = tz.to_storage(request.date.and_time(request.start));
        if start < now {
            return Err(AgendaError::InvalidRange(format!(
                "Cannot book {} {} in the past",
                request.date, request.start
            )));
        }

        let weekday = request.date.weekday();
        let (from, to) = tz.storage_bounds(request.date);
        let snapshot = Snapshot::new(
            self.active_windows_on(&request.establishment_id, weekday),
            self.active_shifts_of(&request.establishment_id),
            self.active_appointments_between(
                &request.establishment_id,
                Some(&request.professional_id),
                from,
                to,
            ),
            tz,
        );
        let plan = DayPlanner::new(
            Arc::new(snapshot),
            Some(request.professional_id),
            request.service_id,
            duration,
            grid,
            *tz,
        )
        .plan_day(request.date);

        if !plan.slots.contains(&request.start) {
            tracing::warn!(
                professional = %request.professional_id,
                date = %request.date,
                start = %request.start,
                "booking re-check rejected start"
            );
            return Err(AgendaError::SlotUnavailable(format!(
                "{} at {} is no longer available",
                request.date,
                request.start.format("%H:%M")
            )));
        }

        let appointment = Appointment {
            id: AppointmentId::new(),
            establishment_id: request.establishment_id,
            professional_id: request.professional_id,
            service_id: request.service_id,
            client_id: request.client_id,
            start,
            duration_minutes: duration,
            status: AppointmentStatus::Active,
        };
        self.appointments.insert(appointment.id, appointment.clone());
        tracing::info!(appointment = %appointment.id, start = %appointment.start, "booked appointment");
        Ok(appointment)
    }

    pub fn cancel_appointment(&mut self, id: &AppointmentId) -> Result<Appointment, AgendaError> {
        self.transition(id, AppointmentStatus::Canceled)
    }

    pub fn complete_appointment(&mut self, id: &AppointmentId) -> Result<Appointment, AgendaError> {
        self.transition(id, AppointmentStatus::Completed)
    }

    /// Only active appointments change status; time fields are never touched.
    fn transition(&mut self, id: &AppointmentId, to: AppointmentStatus) -> Result<Appointment, AgendaError> {
        let appointment = self
            .appointments
            .get_mut(id)
            .ok_or_else(|| AgendaError::NotFound(format!("Appointment {id}")))?;
        if appointment.status != AppointmentStatus::Active {
            return Err(AgendaError::InvalidInput(format!(
                "Appointment {id} is {:?} and cannot become {to:?}",
                appointment.status
            )));
        }
        appointment.status = to;
        Ok(appointment.clone())
    }
}

fn validate_establishment_data(data: &EstablishmentData) -> Result<(), AgendaError> {
    let id = data.establishment.id;
    let foreign = |kind: &str, owner: EstablishmentId| {
        if owner == id {
            Ok(())
        } else {
            Err(AgendaError::InvalidInput(format!(
                "{kind} belongs to establishment {owner}, not {id}"
            )))
        }
    };

    for service in &data.services {
        foreign("Service", service.establishment_id)?;
    }
    for professional in &data.professionals {
        foreign("Professional", professional.establishment_id)?;
        if let Some(unknown) = professional
            .service_ids
            .iter()
            .find(|s| !data.services.iter().any(|known| known.id == **s))
        {
            return Err(AgendaError::InvalidInput(format!(
                "Professional {} offers unknown service {unknown}",
                professional.id
            )));
        }
    }
    for window in &data.windows {
        foreign("Working window", window.establishment_id)?;
        window.validate()?;
        if window.weekdays.is_empty() {
            return Err(AgendaError::InvalidInput(format!(
                "Working window {} has no weekdays",
                window.id
            )));
        }
        if let Some(owner) = window.professional_id {
            if !data.professionals.iter().any(|p| p.id == owner) {
                return Err(AgendaError::InvalidInput(format!(
                    "Working window {} belongs to unknown professional {owner}",
                    window.id
                )));
            }
        }
    }
    for shift in &data.shifts {
        foreign("Shift", shift.establishment_id)?;
        shift.validate()?;
        if shift.weekdays.is_empty() {
            return Err(AgendaError::InvalidInput(format!(
                "Shift '{}' has no weekdays",
                shift.name
            )));
        }
    }
    for appointment in &data.appointments {
        foreign("Appointment", appointment.establishment_id)?;
        if !data.professionals.iter().any(|p| p.id == appointment.professional_id) {
            return Err(AgendaError::InvalidInput(format!(
                "Appointment {} references unknown professional {}",
                appointment.id, appointment.professional_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl AvailabilitySource for RwLock<BookingStore> {
    async fn establishment(&self, id: &EstablishmentId) -> Result<Establishment, AgendaError> {
        self.read().await.establishment(id).cloned()
    }

    async fn service(&self, id: &ServiceId) -> Result<Service, AgendaError> {
        self.read().await.service(id).cloned()
    }

    async fn professional(&self, id: &ProfessionalId) -> Result<Professional, AgendaError> {
        self.read().await.professional(id).cloned()
    }

    async fn active_working_windows(
        &self,
        establishment: &EstablishmentId,
        weekday: Weekday,
    ) -> Result<Vec<WorkingWindow>, AgendaError> {
        Ok(self.read().await.active_windows_on(establishment, weekday))
    }

    async fn active_shifts(
        &self,
        establishment: &EstablishmentId,
        weekday: Weekday,
    ) -> Result<Vec<Shift>, AgendaError> {
        Ok(self.read().await.active_shifts_on(establishment, weekday))
    }

    async fn active_appointments(
        &self,
        establishment: &EstablishmentId,
        professional: Option<&ProfessionalId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AgendaError> {
        Ok(self
            .read()
            .await
            .active_appointments_between(establishment, professional, from, to))
    }
}
