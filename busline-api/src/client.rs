use crate::wire::{
    bookings_from_raw, trips_from_raw, BookBody, CreateTripBody, LoginBody, RawBooking, RawLogin,
    RawMessage, RawStats, RawTrip, RawUser, RegisterBody, UpdateTripBody, WireError,
};
use async_trait::async_trait;
use busline_catalog::{FleetError, TripDraft, TripUpdate};
use busline_core::identity::{Credentials, Registration};
use busline_core::{BoxError, CoreError, SearchFilter, SessionContext, TripSource};
use busline_order::{BookingGateway, BookingRequest};
use busline_shared::{AdminStats, Booking, Trip, User};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Client for the booking server's REST API.
///
/// One request per call: no retries, no timeouts beyond the transport's own.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Option<SessionContext>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            session: None,
        }
    }

    /// Attach a signed-in session; its token goes out as a bearer header
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- auth ----

    pub async fn login(&self, credentials: &Credentials) -> Result<SessionContext, ClientError> {
        credentials.validate()?;
        let raw: RawLogin = self
            .send(
                self.request(Method::POST, "/auth/login")
                    .json(&LoginBody::from(credentials)),
            )
            .await?;
        let (user, token) = raw.into_parts()?;
        tracing::info!(role = %user.role, "Signed in as {}", user.name);
        Ok(SessionContext::new(user, token))
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        registration.validate()?;
        self.send_empty(
            self.request(Method::POST, "/auth/register")
                .json(&RegisterBody::from(registration)),
        )
        .await
    }

    // ---- catalog ----

    /// Trips matching the filter. Records that fail to decode or validate
    /// are skipped.
    pub async fn list_trips(&self, filter: &SearchFilter) -> Result<Vec<Trip>, ClientError> {
        let raw: Vec<Value> = self
            .send(self.request(Method::GET, "/buses").query(&filter.query_pairs()))
            .await?;
        Ok(trips_from_raw(raw))
    }

    pub async fn get_trip(&self, trip_id: &str) -> Result<Trip, ClientError> {
        let raw: RawTrip = self
            .send(self.request(Method::GET, &format!("/buses/{}", trip_id)))
            .await?;
        Ok(Trip::try_from(raw)?)
    }

    pub async fn create_trip(&self, draft: &TripDraft) -> Result<(), ClientError> {
        self.require_admin("creating trips")?;
        draft.validate()?;
        self.send_empty(
            self.request(Method::POST, "/buses")
                .json(&CreateTripBody::from(draft)),
        )
        .await
    }

    pub async fn update_trip(&self, update: &TripUpdate) -> Result<(), ClientError> {
        self.require_admin("updating trips")?;
        update.validate()?;
        self.send_empty(
            self.request(Method::PUT, &format!("/buses/{}", update.id))
                .json(&UpdateTripBody::from(update)),
        )
        .await
    }

    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), ClientError> {
        self.require_admin("deleting trips")?;
        self.send_empty(self.request(Method::DELETE, &format!("/buses/{}", trip_id)))
            .await
    }

    // ---- bookings ----

    pub async fn book(&self, request: &BookingRequest) -> Result<Booking, ClientError> {
        self.require_session()?;
        let raw: RawBooking = self
            .send(
                self.request(Method::POST, "/bookings/book")
                    .json(&BookBody::from(request)),
            )
            .await?;
        Ok(Booking::try_from(raw)?)
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>, ClientError> {
        self.require_session()?;
        let raw: Vec<Value> = self
            .send(self.request(Method::GET, "/bookings/my-bookings"))
            .await?;
        Ok(bookings_from_raw(raw))
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<(), ClientError> {
        self.require_session()?;
        self.send_empty(self.request(Method::PUT, &format!("/bookings/cancel/{}", booking_id)))
            .await
    }

    // ---- admin ----

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, ClientError> {
        self.require_admin("listing all bookings")?;
        let raw: Vec<Value> = self
            .send(self.request(Method::GET, "/bookings/admin"))
            .await?;
        Ok(bookings_from_raw(raw))
    }

    pub async fn confirm_payment(&self, booking_id: &str) -> Result<(), ClientError> {
        self.require_admin("confirming payments")?;
        self.send_empty(self.request(
            Method::PUT,
            &format!("/bookings/confirm-payment/{}", booking_id),
        ))
        .await
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ClientError> {
        self.require_admin("viewing stats")?;
        let raw: RawStats = self.send(self.request(Method::GET, "/admin/stats")).await?;
        Ok(AdminStats::try_from(raw)?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.require_admin("listing users")?;
        let raw: Vec<RawUser> = self.send(self.request(Method::GET, "/admin/users")).await?;
        Ok(raw.into_iter().map(User::from).collect())
    }

    pub async fn user_bookings(&self, user_id: &str) -> Result<Vec<Booking>, ClientError> {
        self.require_admin("viewing user bookings")?;
        let raw: Vec<Value> = self
            .send(self.request(Method::GET, &format!("/admin/user-bookings/{}", user_id)))
            .await?;
        Ok(bookings_from_raw(raw))
    }

    // ---- plumbing ----

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.session {
            Some(session) => builder.header(reqwest::header::AUTHORIZATION, session.bearer()),
            None => builder,
        }
    }

    fn require_session(&self) -> Result<&SessionContext, ClientError> {
        self.session.as_ref().ok_or(ClientError::NotAuthenticated)
    }

    fn require_admin(&self, action: &str) -> Result<&SessionContext, ClientError> {
        let session = self.require_session()?;
        session.require_admin(action)?;
        Ok(session)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.dispatch(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.dispatch(builder).await.map(|_| ())
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<RawMessage>()
            .await
            .ok()
            .and_then(|m| m.message)
            .filter(|m| !m.trim().is_empty());
        tracing::warn!(status = status.as_u16(), "Request failed: {:?}", message);
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TripSource for ApiClient {
    async fn list_trips(&self, filter: &SearchFilter) -> Result<Vec<Trip>, BoxError> {
        Ok(ApiClient::list_trips(self, filter).await?)
    }
}

#[async_trait]
impl BookingGateway for ApiClient {
    async fn submit_booking(&self, request: &BookingRequest) -> Result<Booking, BoxError> {
        self.book(request)
            .await
            .map_err(|e| BoxError::from(e.user_message()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unexpected data from server: {0}")]
    Schema(#[from] WireError),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Admin access required for {0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),
}

impl ClientError {
    /// Text to show the user. Prefers the server's own message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status {
                message: Some(m), ..
            } => m.clone(),
            ClientError::Status { .. } => "Something went wrong".to_string(),
            ClientError::Request(_) => "Unable to reach the server".to_string(),
            ClientError::NotAuthenticated => "Please log in first".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated | ClientError::Status { status: 401, .. }
        )
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotAuthenticated => ClientError::NotAuthenticated,
            CoreError::Forbidden(action) => ClientError::Forbidden(action),
            CoreError::ValidationError(msg) => ClientError::Invalid(msg),
        }
    }
}

impl From<FleetError> for ClientError {
    fn from(err: FleetError) -> Self {
        ClientError::Invalid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_shared::Role;

    fn session(role: Role) -> SessionContext {
        SessionContext::new(
            User {
                id: None,
                name: "Tester".to_string(),
                email: None,
                role,
            },
            "t0k",
        )
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn test_rider_endpoints_need_session() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.my_bookings().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_admin_endpoints_need_admin() {
        let client = ApiClient::new("http://127.0.0.1:9").with_session(session(Role::Rider));
        let err = client.admin_stats().await.unwrap_err();
        assert!(matches!(err, ClientError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_invalid_draft_never_sent() {
        let client = ApiClient::new("http://127.0.0.1:9").with_session(session(Role::Admin));
        let draft = TripDraft::new(40);
        let err = client.create_trip(&draft).await.unwrap_err();
        assert!(matches!(err, ClientError::Invalid(_)));
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ClientError::Status {
            status: 409,
            message: Some("Seat 4 already booked".to_string()),
        };
        assert_eq!(err.user_message(), "Seat 4 already booked");
        assert_eq!(err.to_string(), "Server returned 409: Seat 4 already booked");

        let bare = ClientError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(bare.user_message(), "Something went wrong");
    }
}
