mod conversions;
mod types;

pub(crate) use conversions::*;
pub(crate) use types::*;

use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_router,
};
use tokio::sync::RwLock;

use crate::availability::{AvailabilityRequest, AvailabilityService};
use crate::booking::model::{AppointmentId, ClientId, EstablishmentId, ProfessionalId, ServiceId};
use crate::booking::{BookingRequest, BookingStore};
use crate::config::AgendaConfig;

#[derive(Clone)]
pub struct AgendaServer {
    store: Arc<RwLock<BookingStore>>,
    engine: Arc<AvailabilityService<RwLock<BookingStore>>>,
}

impl ServerHandler for AgendaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "agenda".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Agenda resolves bookable start times for appointment-based establishments. \
                 Recommended workflow: \
                 1) Load each establishment with load_establishment (services, professionals, working windows, shifts, existing appointments), \
                 2) Call resolve_availability for a service, optionally scoped to one professional, to get the next days with free start times, \
                 3) Book one of the returned starts with book_appointment. \
                 Booking re-checks the start; if it reports the slot unavailable, resolve again and pick another start. \
                 All dates and times are local to the establishment."
                    .into(),
            ),
        }
    }
}

// -- Tool implementations --

#[tool_router]
impl AgendaServer {
    pub fn new(config: &AgendaConfig) -> Self {
        let store = Arc::new(RwLock::new(BookingStore::new()));
        let engine = Arc::new(AvailabilityService::new(Arc::clone(&store), config));
        Self { store, engine }
    }

    // === Loading ===

    #[tool(description = "Load an establishment with its services, professionals, weekly working windows, shifts and existing appointments. Loading an existing establishment ID replaces all of its records.")]
    async fn load_establishment(
        &self,
        params: Parameters<LoadEstablishmentParams>,
    ) -> Result<CallToolResult, McpError> {
        let data = document_to_data(&params.0).map_err(agenda_err)?;

        let mut store = self.store.write().await;
        let summary = store.load_establishment(data).map_err(agenda_err)?;

        Ok(json_text(&summary))
    }

    // === Querying ===

    #[tool(description = "Resolve the next days with free start times for a service, from a start date forward. Stops after 7 days with availability or a year of days. Open days that are fully booked are reported with no slots; closed days are omitted. Returns {outcome: complete|partial, days: [{date, slots}]}.")]
    async fn resolve_availability(
        &self,
        params: Parameters<ResolveAvailabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let from_date = match p.from_date.as_deref() {
            Some(s) => parse_date(s).map_err(agenda_err)?,
            None => self.engine.timezone().local_today(self.engine.now()),
        };
        let request = AvailabilityRequest {
            establishment_id: EstablishmentId(
                parse_uuid(&p.establishment_id, "establishment").map_err(agenda_err)?,
            ),
            professional_id: p
                .professional_id
                .as_deref()
                .map(|id| parse_uuid(id, "professional").map(ProfessionalId))
                .transpose()
                .map_err(agenda_err)?,
            service_id: ServiceId(parse_uuid(&p.service_id, "service").map_err(agenda_err)?),
            from_date,
            tick_minutes: p.tick_minutes,
            deadline: p.deadline_ms.map(Duration::from_millis),
        };

        let outcome = self
            .engine
            .resolve_availability(&request)
            .await
            .map_err(agenda_err)?;

        Ok(json_text(&AvailabilityView::from(&outcome)))
    }

    #[tool(description = "List the appointments of a local day for an establishment, optionally for one professional, ordered by start time. Includes canceled and completed appointments.")]
    async fn list_appointments(
        &self,
        params: Parameters<ListAppointmentsParams>,
    ) -> Result<CallToolResult, McpError> {
        let establishment_id = EstablishmentId(
            parse_uuid(&params.0.establishment_id, "establishment").map_err(agenda_err)?,
        );
        let professional_id = params
            .0
            .professional_id
            .as_deref()
            .map(|id| parse_uuid(id, "professional").map(ProfessionalId))
            .transpose()
            .map_err(agenda_err)?;
        let date = parse_date(&params.0.date).map_err(agenda_err)?;
        let tz = self.engine.timezone();

        let store = self.store.read().await;
        store.establishment(&establishment_id).map_err(agenda_err)?;
        let views: Vec<AppointmentView> = store
            .appointments_on(&establishment_id, professional_id.as_ref(), date, tz)
            .iter()
            .map(|a| appointment_view(a, tz))
            .collect();

        Ok(json_text(&views))
    }

    // === Mutations ===

    #[tool(description = "Book an appointment at a local date and start time. The start is re-checked against current appointments; if it is no longer free the booking is rejected and nothing is stored.")]
    async fn book_appointment(
        &self,
        params: Parameters<BookAppointmentParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let request = BookingRequest {
            establishment_id: EstablishmentId(
                parse_uuid(&p.establishment_id, "establishment").map_err(agenda_err)?,
            ),
            professional_id: ProfessionalId(
                parse_uuid(&p.professional_id, "professional").map_err(agenda_err)?,
            ),
            service_id: ServiceId(parse_uuid(&p.service_id, "service").map_err(agenda_err)?),
            client_id: match p.client_id.as_deref() {
                Some(id) => ClientId(parse_uuid(id, "client").map_err(agenda_err)?),
                None => ClientId::new(),
            },
            date: parse_date(&p.date).map_err(agenda_err)?,
            start: parse_time(&p.start).map_err(agenda_err)?,
            tick_minutes: p.tick_minutes.unwrap_or(self.engine.default_tick_minutes()),
        };
        let tz = self.engine.timezone();

        let mut store = self.store.write().await;
        let appointment = store
            .book_appointment(&request, tz, self.engine.now())
            .map_err(agenda_err)?;

        Ok(json_text(&appointment_view(&appointment, tz)))
    }

    #[tool(description = "Cancel an active appointment, freeing its time.")]
    async fn cancel_appointment(
        &self,
        params: Parameters<AppointmentIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = AppointmentId(
            parse_uuid(&params.0.appointment_id, "appointment").map_err(agenda_err)?,
        );

        let mut store = self.store.write().await;
        let appointment = store.cancel_appointment(&id).map_err(agenda_err)?;

        Ok(json_text(&appointment_view(&appointment, self.engine.timezone())))
    }

    #[tool(description = "Mark an active appointment as completed. Completed appointments no longer block availability.")]
    async fn complete_appointment(
        &self,
        params: Parameters<AppointmentIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = AppointmentId(
            parse_uuid(&params.0.appointment_id, "appointment").map_err(agenda_err)?,
        );

        let mut store = self.store.write().await;
        let appointment = store.complete_appointment(&id).map_err(agenda_err)?;

        Ok(json_text(&appointment_view(&appointment, self.engine.timezone())))
    }
}

impl AgendaServer {
    pub fn into_router(self) -> rmcp::handler::server::router::Router<Self> {
        let mut router = rmcp::handler::server::router::Router::new(self);
        router.tool_router = Self::tool_router();
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(result: &CallToolResult) -> serde_json::Value {
        let text = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn document() -> (LoadEstablishmentParams, String, String, String) {
        let establishment_id = uuid::Uuid::new_v4().to_string();
        let service_id = uuid::Uuid::new_v4().to_string();
        let professional_id = uuid::Uuid::new_v4().to_string();
        let doc = LoadEstablishmentParams {
            id: Some(establishment_id.clone()),
            name: "Studio".to_string(),
            services: vec![ServiceInput {
                id: Some(service_id.clone()),
                name: "Haircut".to_string(),
                duration: "01:00".to_string(),
                active: None,
            }],
            professionals: vec![ProfessionalInput {
                id: Some(professional_id.clone()),
                name: "Ana".to_string(),
                service_ids: vec![service_id.clone()],
                active: None,
            }],
            working_windows: vec![WorkingWindowInput {
                id: None,
                professional_id: None,
                weekdays: vec![0, 1, 2, 3, 4, 5, 6],
                start: "08:00".to_string(),
                end: "12:00".to_string(),
                service_ids: None,
                active: None,
            }],
            shifts: None,
            appointments: None,
        };
        (doc, establishment_id, service_id, professional_id)
    }

    fn far_future() -> String {
        "2099-03-02".to_string()
    }

    #[tokio::test]
    async fn resolve_then_book_then_resolve_again() {
        let server = AgendaServer::new(&AgendaConfig::default());
        let (doc, establishment_id, service_id, professional_id) = document();
        server.load_establishment(Parameters(doc)).await.unwrap();

        let resolve = || ResolveAvailabilityParams {
            establishment_id: establishment_id.clone(),
            service_id: service_id.clone(),
            professional_id: Some(professional_id.clone()),
            from_date: Some(far_future()),
            tick_minutes: None,
            deadline_ms: None,
        };

        let before = text_of(&server.resolve_availability(Parameters(resolve())).await.unwrap());
        assert_eq!(before["outcome"], "complete");
        assert_eq!(before["days"].as_array().unwrap().len(), 7);
        assert_eq!(before["days"][0]["date"], "2099-03-02");
        assert_eq!(before["days"][0]["slots"][0], "08:00");

        let booked = server
            .book_appointment(Parameters(BookAppointmentParams {
                establishment_id: establishment_id.clone(),
                professional_id: professional_id.clone(),
                service_id: service_id.clone(),
                client_id: None,
                date: far_future(),
                start: "08:00".to_string(),
                tick_minutes: None,
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&booked)["start"], "08:00");

        let after = text_of(&server.resolve_availability(Parameters(resolve())).await.unwrap());
        assert_eq!(
            after["days"][0]["slots"],
            serde_json::json!(["09:30", "10:00", "10:30", "11:00"])
        );
    }

    #[tokio::test]
    async fn double_booking_is_invalid_params() {
        let server = AgendaServer::new(&AgendaConfig::default());
        let (doc, establishment_id, service_id, professional_id) = document();
        server.load_establishment(Parameters(doc)).await.unwrap();

        let book = || BookAppointmentParams {
            establishment_id: establishment_id.clone(),
            professional_id: professional_id.clone(),
            service_id: service_id.clone(),
            client_id: None,
            date: far_future(),
            start: "09:00".to_string(),
            tick_minutes: None,
        };
        server.book_appointment(Parameters(book())).await.unwrap();
        let err = server.book_appointment(Parameters(book())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_establishment_is_resource_not_found() {
        let server = AgendaServer::new(&AgendaConfig::default());
        let err = server
            .resolve_availability(Parameters(ResolveAvailabilityParams {
                establishment_id: uuid::Uuid::new_v4().to_string(),
                service_id: uuid::Uuid::new_v4().to_string(),
                professional_id: None,
                from_date: Some(far_future()),
                tick_minutes: None,
                deadline_ms: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_and_list_appointments() {
        let server = AgendaServer::new(&AgendaConfig::default());
        let (doc, establishment_id, service_id, professional_id) = document();
        server.load_establishment(Parameters(doc)).await.unwrap();

        let booked = text_of(
            &server
                .book_appointment(Parameters(BookAppointmentParams {
                    establishment_id: establishment_id.clone(),
                    professional_id,
                    service_id,
                    client_id: None,
                    date: far_future(),
                    start: "10:00".to_string(),
                    tick_minutes: None,
                }))
                .await
                .unwrap(),
        );
        let appointment_id = booked["appointment_id"].as_str().unwrap().to_string();

        let canceled = text_of(
            &server
                .cancel_appointment(Parameters(AppointmentIdParams {
                    appointment_id: appointment_id.clone(),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(canceled["status"], "canceled");

        let listed = text_of(
            &server
                .list_appointments(Parameters(ListAppointmentsParams {
                    establishment_id,
                    professional_id: None,
                    date: far_future(),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["appointment_id"], appointment_id.as_str());

        let err = server
            .complete_appointment(Parameters(AppointmentIdParams { appointment_id }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
