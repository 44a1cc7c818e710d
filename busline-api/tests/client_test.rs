use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use busline_api::{ApiClient, ClientError};
use busline_catalog::{FareEngine, SeatSelection};
use busline_core::identity::Credentials;
use busline_core::{CatalogView, SearchFilter};
use busline_order::{BookingLedger, BookingState, Checkout, CheckoutError};
use busline_shared::{PaymentMethod, Role};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const TOKEN: &str = "stub-token";

#[derive(Clone, Default)]
struct Stub {
    hits: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn record(&self, what: impl Into<String>) {
        self.hits.lock().unwrap().push(what.into());
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn trip_json(id: &str) -> Value {
    json!({
        "_id": id,
        "busName": "Sea Breeze",
        "busNumber": "KA19F2020",
        "stops": [
            {"name": "Mangaluru", "fareFromStart": 0},
            {"name": "Udupi", "fareFromStart": 120},
            {"name": "Karwar", "fareFromStart": 400}
        ],
        "startDateTime": "2030-11-02T06:00:00Z",
        "endDateTime": "2030-11-02T12:30:00Z",
        "seatsAvailable": 10,
        "totalSeats": 40,
        "bookedSeats": [4],
        "isActive": true
    })
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({"token": TOKEN, "role": "admin", "name": "Meera"})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
    }
}

async fn list_buses(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut keys: Vec<_> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    keys.sort();
    stub.record(format!("list?{}", keys.join("&")));

    let mut mistyped = trip_json("t2");
    mistyped["bookedSeats"] = json!("4,5");
    mistyped["seatsAvailable"] = json!([10]);

    Json(json!([
        trip_json("t1"),
        {"_id": "broken", "stops": [{"name": "Nowhere"}]},
        mistyped
    ]))
}

async fn get_bus(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "t1" => (StatusCode::OK, Json(trip_json("t1"))),
        "oversold" => {
            let mut trip = trip_json("oversold");
            trip["seatsAvailable"] = json!(50);
            (StatusCode::OK, Json(trip))
        }
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Bus not found"})),
        ),
    }
}

async fn book(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Not authorized"})),
        );
    }
    stub.record(format!("book {}", body));

    if body["seats"] == json!([4]) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Seat 4 is already booked"})),
        );
    }
    let seats = body["seatsBooked"].as_u64().unwrap_or(1);
    (
        StatusCode::CREATED,
        Json(json!({
            "_id": "bk-100",
            "bus": body["busId"],
            "from": body["from"],
            "to": body["to"],
            "seatsBooked": seats,
            "totalFare": 280 * seats,
            "paymentMethod": body["paymentMethod"],
            "status": "confirmed"
        })),
    )
}

async fn my_bookings(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Not authorized"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!([{
            "_id": "bk-1",
            "bus": {"_id": "t1", "busName": "Sea Breeze", "startDateTime": "2030-11-02T06:00:00Z"},
            "seats": [7],
            "from": "Mangaluru",
            "to": "Udupi",
            "totalFare": 120,
            "paymentMethod": "cash",
            "paymentStatus": "pending",
            "status": "confirmed"
        }])),
    )
}

async fn confirm_payment(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    stub.record(format!("confirm {}", id));
    StatusCode::OK
}

async fn stats(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "summary": {"totalRevenue": 5000, "onlineRevenue": 4000, "cashRevenue": 1000},
            "monthlyTrend": [{"name": "Nov", "revenue": 5000}]
        })),
    )
}

async fn spawn_stub() -> (String, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/buses", get(list_buses))
        .route("/api/buses/{id}", get(get_bus))
        .route("/api/bookings/book", post(book))
        .route("/api/bookings/my-bookings", get(my_bookings))
        .route("/api/bookings/confirm-payment/{id}", put(confirm_payment))
        .route("/api/admin/stats", get(stats))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), stub)
}

async fn signed_in(base_url: &str) -> ApiClient {
    let client = ApiClient::new(base_url);
    let session = client
        .login(&Credentials::new("meera@example.com", "secret"))
        .await
        .unwrap();
    client.with_session(session)
}

#[tokio::test]
async fn test_login_and_bearer_header() {
    let (base_url, _stub) = spawn_stub().await;
    let client = signed_in(&base_url).await;

    let session = client.session().unwrap();
    assert_eq!(session.role(), Role::Admin);
    assert_eq!(session.user.name, "Meera");

    let bookings = client.my_bookings().await.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].payment_method, PaymentMethod::Cash);
}

#[tokio::test]
async fn test_bad_login_surfaces_server_message() {
    let (base_url, _stub) = spawn_stub().await;
    let client = ApiClient::new(&base_url);

    let err = client
        .login(&Credentials::new("meera@example.com", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn test_search_sends_normalized_query_and_skips_invalid() {
    let (base_url, stub) = spawn_stub().await;
    let client = ApiClient::new(&base_url);

    let filter = SearchFilter::new("  MANGALURU ", "", None);
    let trips = client.list_trips(&filter).await.unwrap();

    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].id, "t1");
    assert_eq!(stub.hits(), vec!["list?from=mangaluru".to_string()]);
}

#[tokio::test]
async fn test_catalog_reset_makes_no_request() {
    let (base_url, stub) = spawn_stub().await;
    let client = ApiClient::new(&base_url);
    let mut view = CatalogView::new();

    view.load(&client).await.unwrap();
    view.search(&client, SearchFilter::new("", "karwar", None))
        .await
        .unwrap();
    assert_eq!(stub.hits().len(), 2);

    let restored = view.reset().len();
    assert_eq!(restored, 1);
    assert!(!view.has_searched());
    assert_eq!(stub.hits().len(), 2);
}

#[tokio::test]
async fn test_invalid_trip_detail_is_schema_error() {
    let (base_url, _stub) = spawn_stub().await;
    let client = ApiClient::new(&base_url);

    let err = client.get_trip("oversold").await.unwrap_err();
    assert!(matches!(err, ClientError::Schema(_)));

    let err = client.get_trip("missing").await.unwrap_err();
    assert_eq!(err.user_message(), "Bus not found");
}

#[tokio::test]
async fn test_cash_checkout_through_client() {
    let (base_url, stub) = spawn_stub().await;
    let client = signed_in(&base_url).await;
    let trip = client.get_trip("t1").await.unwrap();

    let checkout = Checkout::new(FareEngine::default(), Arc::new(client.clone()));
    let mut ledger = BookingLedger::new();
    let pending = checkout
        .prepare(
            &mut ledger,
            &trip,
            SeatSelection::Segment {
                origin: "Udupi".to_string(),
                destination: "Karwar".to_string(),
                seats: 2,
            },
            PaymentMethod::Cash,
        )
        .unwrap();
    assert_eq!(pending.quote.total, 560);

    let outcome = checkout.complete(&mut ledger, pending).await.unwrap();
    assert_eq!(outcome.state, BookingState::PendingPayment);
    assert_eq!(outcome.booking.total_fare, 560);
    assert_eq!(outcome.notice, "Please pay the amount on boarding.");

    let hits = stub.hits();
    assert!(hits.iter().any(|h| h.contains("\"seatsBooked\":2")));
}

#[tokio::test]
async fn test_seat_conflict_reported_once() {
    let (base_url, stub) = spawn_stub().await;
    let client = signed_in(&base_url).await;
    let mut trip = client.get_trip("t1").await.unwrap();
    // Stale view: the client doesn't know seat 4 went
    trip.booked_seats.clear();

    let checkout = Checkout::new(FareEngine::default(), Arc::new(client.clone()));
    let mut ledger = BookingLedger::new();
    let mut pending = checkout
        .prepare(
            &mut ledger,
            &trip,
            SeatSelection::Numbered(vec![4]),
            PaymentMethod::Online,
        )
        .unwrap();
    pending.confirm_payment();
    let handle = pending.handle;

    let err = checkout.complete(&mut ledger, pending).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Gateway(ref m) if m == "Seat 4 is already booked"));
    assert_eq!(ledger.get(&handle).unwrap().state, BookingState::Draft);

    let book_calls = stub.hits().iter().filter(|h| h.starts_with("book")).count();
    assert_eq!(book_calls, 1);
}

#[tokio::test]
async fn test_admin_confirm_payment_and_stats() {
    let (base_url, stub) = spawn_stub().await;
    let client = signed_in(&base_url).await;

    client.confirm_payment("bk-1").await.unwrap();
    assert!(stub.hits().contains(&"confirm bk-1".to_string()));

    let stats = client.admin_stats().await.unwrap();
    assert_eq!(stats.summary.total_revenue, 5000);
    assert_eq!(stats.monthly_trend.len(), 1);
}

#[tokio::test]
async fn test_unreachable_server() {
    let client = ApiClient::new("http://127.0.0.1:1/api");
    let err = client.list_trips(&SearchFilter::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::Request(_)));
    assert_eq!(err.user_message(), "Unable to reach the server");
}
