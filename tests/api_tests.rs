use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use base64::{engine::general_purpose, Engine as _};
use seat_inventory::domain::SeatStatus;
use seat_inventory::services::notifications::LogNotifier;
use seat_inventory::services::payments::MockPaymentProvider;
use seat_inventory::web::app::{configure_app, AppState};
use serde_json::{json, Value};
#[path="utils/mod.rs"] mod utils;
use utils::*;

fn app_state(store: &seat_inventory::persistence::memory::InMemoryStore) -> AppState {
    AppState::new(store.clone(), hold_duration(), MockPaymentProvider::shared(), LogNotifier::shared(), None)
}

fn jwt_payload(sub: &str, role: &str) -> String {
    general_purpose::STANDARD.encode(json!({ "sub": sub, "role": role }).to_string())
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&$store)))
                .configure(configure_app),
        )
        .await
    };
}

#[actix_web::test]
async fn health_answers_ok() {
    let store = store_with(vec![], vec![]);
    let app = app!(store);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn lock_then_conflict_then_release() {
    let store = store_with(vec![sample_event()], vec![]);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/events/concert/lock-seats")
        .set_json(json!({ "seatIds": ["A1", "A2"] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["holdUntil"].is_string());

    let req = test::TestRequest::post()
        .uri("/events/concert/lock-seats")
        .set_json(json!({ "seatIds": ["A2", "A3"] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["conflicts"], json!(["A2"]));

    let req = test::TestRequest::post()
        .uri("/events/concert/release-seats")
        .set_json(json!({ "seatIds": ["A1"] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true }));

    // Unload beacon: no JSON body, ids in the query string.
    let req = test::TestRequest::post()
        .uri("/events/concert/release-seats?seatIds=A2")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Available);
    assert_eq!(seat_status(&store, EVENT_ID, "A2"), SeatStatus::Available);
}

#[actix_web::test]
async fn hold_probe_and_seat_map() {
    let store = store_with(vec![sample_event()], vec![]);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/seats/hold")
        .set_json(json!({ "eventId": "concert", "seatId": "A1" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "success": true }));

    let req = test::TestRequest::get().uri("/events/concert/seats").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["seats"].as_array().map(Vec::len), Some(4));

    let req = test::TestRequest::get().uri("/events/missing/seats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn order_conflict_is_409_with_seat_ids() {
    let mut event = sample_event();
    event.seats[1].status = SeatStatus::Sold;
    let store = store_with(vec![event], vec![]);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({
            "customer": { "name": "Ada Lovelace", "email": "ada@example.com" },
            "event": "concert",
            "seats": ["A1", "A2"],
            "serviceFee": "2.00",
            "paymentMode": "ONLINE",
            "transactionId": "txn_0042"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], json!("Some seats are not available"));
    assert_eq!(body["conflicts"], json!([{ "seatId": "A2", "reason": "SOLD" }]));
    assert_eq!(body["transactionId"], json!("txn_0042"));
}

#[actix_web::test]
async fn order_ticket_lookup_and_check_in() {
    let store = store_with(vec![sample_event()], vec![]);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/orders")
        .set_json(json!({
            "customer": { "name": "Ada Lovelace", "email": "ada@example.com" },
            "event": "concert",
            "seats": ["A1"],
            "serviceFee": 2,
            "paymentMode": "ONLINE",
            "transactionId": "txn_0043"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    assert_eq!(order["totalAmount"], json!("52.00"));

    let order_id = order["id"].as_str().unwrap();
    let ticket_id = order["tickets"][0]["id"].as_str().unwrap();

    let req = test::TestRequest::get().uri(&format!("/orders/{}", order_id)).to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["id"], order["id"]);

    let req = test::TestRequest::get().uri(&format!("/tickets/{}", ticket_id)).to_request();
    let ticket: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ticket["orderId"], order["id"]);
    assert_eq!(ticket["seatId"], json!("A1"));

    let req = test::TestRequest::post().uri(&format!("/tickets/{}/check-in", ticket_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri(&format!("/tickets/{}/check-in", ticket_id))
        .insert_header(("x-jwt-payload", jwt_payload("ada", "CUSTOMER")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/tickets/{}/check-in", ticket_id))
        .insert_header(("x-jwt-payload", jwt_payload("door-1", "ORGANIZER")))
        .to_request();
    let checked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(checked["checkedIn"], json!(true));
    assert!(checked["checkInDate"].is_string());

    let req = test::TestRequest::get().uri("/tickets/UNKNOWN").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn negative_fee_and_oversized_amounts_are_400() {
    let store = store_with(vec![sample_event()], vec![]);
    let app = app!(store);

    for fee in [json!("-50.00"), json!("99999999999999999")] {
        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({
                "customer": { "name": "Ada Lovelace", "email": "ada@example.com" },
                "event": "concert",
                "seats": ["A1"],
                "serviceFee": fee,
                "paymentMode": "FREE"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Available);
}

#[actix_web::test]
async fn seat_override_requires_admin_or_organizer() {
    let store = store_with(vec![sample_event()], vec![]);
    let app = app!(store);
    let body = json!({ "seatIds": ["A1"], "status": "UNAVAILABLE" });

    let req = test::TestRequest::put().uri("/events/concert/seats").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::put()
        .uri("/events/concert/seats")
        .insert_header(("x-jwt-payload", jwt_payload("shopper", "CUSTOMER")))
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/events/concert/seats")
        .insert_header(("x-jwt-payload", jwt_payload("organizer-1", "ORGANIZER")))
        .set_json(&body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], json!(true));
    assert_eq!(resp["updated"], json!(1));
    assert_eq!(seat_status(&store, EVENT_ID, "A1"), SeatStatus::Unavailable);
}

#[actix_web::test]
async fn coupon_validation() {
    let code = coupon("c-5", "FIVE", seat_inventory::domain::DiscountType::Fixed, 5, seat_inventory::domain::CouponRule::Code);
    let store = store_with(vec![sample_event()], vec![code]);
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/coupons/validate")
        .set_json(json!({ "code": "five", "eventId": "concert", "seats": ["A1"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], json!("c-5"));
    assert_eq!(body["discount"], json!("5.00"));

    let req = test::TestRequest::post()
        .uri("/coupons/validate")
        .set_json(json!({ "code": "NOPE", "eventId": "concert", "seats": ["A1"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
