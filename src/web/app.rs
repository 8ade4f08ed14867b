use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::domain::{EventId, SeatId};
use crate::persistence::memory::InMemoryStore;
use crate::persistence::{CouponStore, EventStore, OrderStore};
use crate::services::notifications::LogNotifier;
use crate::services::payments::MockPaymentProvider;
use crate::services::{DiscountService, HoldManager, LockOutcome, Notifier, OrderService, PaymentProvider};
use super::error::ApiError;
use super::types::{
    AuthUser, CouponValidateRequest, CouponValidateResponse, CreateOrderRequest, HoldRequest, LockResponse, Role,
    SeatIdsQuery, SeatIdsRequest, SeatMap, StatusOverrideRequest, StatusOverrideResponse, SuccessResponse,
    TicketDetail,
};

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub holds: HoldManager,
    pub discounts: DiscountService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(
        store: InMemoryStore,
        hold_duration: chrono::Duration,
        payments: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        admin_email: Option<String>,
    ) -> Self {
        let events: Arc<dyn EventStore> = Arc::new(store.clone());
        let coupons: Arc<dyn CouponStore> = Arc::new(store.clone());
        let orders: Arc<dyn OrderStore> = Arc::new(store);

        let holds = HoldManager::new(events.clone(), hold_duration);
        let discounts = DiscountService::new(coupons, events.clone());
        let orders = OrderService::new(events.clone(), orders, discounts.clone(), payments, notifier, admin_email);

        AppState { events, holds, discounts, orders }
    }

    pub fn with_max_tickets(mut self, max_tickets: u32) -> Self {
        self.discounts = self.discounts.with_max_tickets(max_tickets);
        self.orders = self.orders.with_max_tickets(max_tickets);
        self
    }
}

// Initialize application state
pub fn init_app_state(store: InMemoryStore, config: &Config) -> AppState {
    AppState::new(
        store,
        config.hold_duration(),
        MockPaymentProvider::shared(),
        LogNotifier::shared(),
        config.admin_email.clone(),
    )
    .with_max_tickets(config.max_tickets_per_order)
}

// Read x-jwt-payload header and extract user information
fn get_auth_user(req: &HttpRequest) -> Option<AuthUser> {
    let auth_header = req.headers().get("x-jwt-payload")?;
    let auth_str = auth_header.to_str().ok()?;

    let decoded = general_purpose::STANDARD.decode(auth_str).ok()?;
    let json: Value = serde_json::from_slice(&decoded).ok()?;

    let sub = json.get("sub")?.as_str()?;
    let role = json.get("role").and_then(|r| serde_json::from_value(r.clone()).ok()).unwrap_or(Role::Customer);

    Some(AuthUser { user_id: sub.to_string(), role })
}

fn require_seat_admin(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let user = get_auth_user(req).ok_or_else(ApiError::unauthorized)?;
    if !user.role.can_override_seats() {
        return Err(ApiError::forbidden());
    }
    Ok(user)
}

async fn health() -> ApiResult {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

// Advisory availability probe
async fn hold_seat(body: web::Json<HoldRequest>, data: web::Data<AppState>) -> ApiResult {
    let available = data.holds.hold_seat(&body.event_id, &body.seat_id)?;
    Ok(HttpResponse::Ok().json(SuccessResponse { success: available }))
}

async fn lock_seats(path: web::Path<EventId>, body: web::Json<SeatIdsRequest>, data: web::Data<AppState>) -> ApiResult {
    let event_id = path.into_inner();
    let response = match data.holds.lock_seats(&event_id, &body.seat_ids, Utc::now())? {
        LockOutcome::Locked { hold_until } => LockResponse::locked(hold_until),
        LockOutcome::Conflicts(conflicts) => LockResponse::rejected(conflicts),
    };
    Ok(HttpResponse::Ok().json(response))
}

// Accepts a JSON body, or the query string when sent as an unload beacon
async fn release_seats(
    path: web::Path<EventId>,
    query: web::Query<SeatIdsQuery>,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> ApiResult {
    let event_id = path.into_inner();
    let from_body: Vec<SeatId> = serde_json::from_slice::<SeatIdsRequest>(&body)
        .map(|req| req.seat_ids)
        .unwrap_or_default();
    let seat_ids = if from_body.is_empty() { query.seat_ids() } else { from_body };

    let released = data.holds.release_seats(&event_id, &seat_ids)?;
    debug!("Release of {:?} on event {} freed {}", seat_ids, event_id, released);
    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}

async fn set_seat_status(
    req: HttpRequest,
    path: web::Path<EventId>,
    body: web::Json<StatusOverrideRequest>,
    data: web::Data<AppState>,
) -> ApiResult {
    let user = require_seat_admin(&req)?;
    let event_id = path.into_inner();
    info!("{} sets {:?} on event {} to {}", user.user_id, body.seat_ids, event_id, body.status);

    let outcome = data.holds.set_status(&event_id, &body.seat_ids, body.status)?;
    Ok(HttpResponse::Ok().json(StatusOverrideResponse { success: true, updated: outcome.updated, skipped: outcome.skipped }))
}

async fn get_seats(path: web::Path<EventId>, data: web::Data<AppState>) -> ApiResult {
    let event = data.events.load(&path)?.value;
    event.ensure_live()?;
    Ok(HttpResponse::Ok().json(SeatMap { event_id: event.id, seats: event.seats }))
}

async fn create_order(body: web::Json<CreateOrderRequest>, data: web::Data<AppState>) -> ApiResult {
    let order = data.orders.create_order(body.into_inner().into_order_request(), Utc::now())?;
    Ok(HttpResponse::Created().json(order))
}

async fn get_order(path: web::Path<String>, data: web::Data<AppState>) -> ApiResult {
    let order = data.orders.find_order(&path)?;
    Ok(HttpResponse::Ok().json(order))
}

async fn get_ticket(path: web::Path<String>, data: web::Data<AppState>) -> ApiResult {
    let (order, ticket) = data.orders.find_ticket(&path)?;
    Ok(HttpResponse::Ok().json(TicketDetail::new(&order, ticket)))
}

// Door staff only
async fn check_in_ticket(req: HttpRequest, path: web::Path<String>, data: web::Data<AppState>) -> ApiResult {
    let user = require_seat_admin(&req)?;
    let ticket = data.orders.toggle_check_in(&path, Utc::now())?;
    debug!("{} toggled check-in of ticket {}", user.user_id, ticket.id);
    Ok(HttpResponse::Ok().json(ticket))
}

async fn validate_coupon(body: web::Json<CouponValidateRequest>, data: web::Data<AppState>) -> ApiResult {
    let applied = data.discounts.validate(&body.code, &body.event_id, &body.selection(), Utc::now())?;
    Ok(HttpResponse::Ok().json(CouponValidateResponse::from(applied)))
}

// Configure routes
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .route("/health", web::get().to(health))
            .route("/seats/hold", web::post().to(hold_seat))
            .route("/events/{id}/seats", web::get().to(get_seats))
            .route("/events/{id}/seats", web::put().to(set_seat_status))
            .route("/events/{id}/lock-seats", web::post().to(lock_seats))
            .route("/events/{id}/release-seats", web::post().to(release_seats))
            .route("/orders", web::post().to(create_order))
            .route("/orders/{id}", web::get().to(get_order))
            .route("/tickets/{id}", web::get().to(get_ticket))
            .route("/tickets/{id}/check-in", web::post().to(check_in_ticket))
            .route("/coupons/validate", web::post().to(validate_coupon)),
    );
}

// Main application
pub async fn run_app(config: Config, app_state: AppState) -> std::io::Result<()> {
    info!("Starting server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(Logger::default())
            .configure(configure_app)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
