use std::sync::Arc;
use std::thread;
use std::time::Duration;

use actix_web::{App, middleware, test, web};
use gstate::backend::MockGpioBackend;
use gstate::config::StorageErrorPolicy;
use gstate::gpio::{Electrical, PinController};
use gstate::routes::{AppState, MAX_STATE_PAYLOAD};
use gstate::store::{MemoryStore, StateStore};
use serde_json::{Value, json};

fn sample_state(
    policy: StorageErrorPolicy,
) -> (
    AppState<MockGpioBackend, MemoryStore>,
    Arc<MockGpioBackend>,
    Arc<MemoryStore>,
) {
    let backend = Arc::new(MockGpioBackend::default());
    let store = Arc::new(MemoryStore::default());
    let controller = Arc::new(PinController::new(backend.clone()));
    let state = AppState::new(controller, store.clone(), policy);
    (state, backend, store)
}

macro_rules! init_app {
    ($state:expr) => {
        init_app!($state, "")
    };
    ($state:expr, $path:expr) => {
        test::init_service(
            App::new()
                .wrap(middleware::NormalizePath::trim())
                .app_data(web::Data::new($state.clone()))
                .service($state.api_scope($path)),
        )
        .await
    };
}

#[actix_rt::test]
async fn set_then_get_round_trip() {
    let (state, _, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/7")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body = test::read_body(resp).await;
    assert!(body.is_empty());

    let req = test::TestRequest::get().uri("/gpios/7").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "is_active": true }));
}

#[actix_rt::test]
async fn unknown_pin_reports_inactive() {
    let (state, _, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/gpios/42").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "is_active": false }));
}

#[actix_rt::test]
async fn repeated_set_is_idempotent() {
    let (state, _, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/gpios/3")
            .set_payload(r#"{"active":true}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    assert_eq!(store.len(), 1);
    assert!(store.status(3).unwrap());
}

#[actix_rt::test]
async fn last_write_wins() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    for active in [true, false, true, false] {
        let req = test::TestRequest::post()
            .uri("/gpios/12")
            .set_json(json!({ "active": active }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    assert!(!store.status(12).unwrap());
    assert_eq!(backend.level(12), Some(Electrical::High));
    assert_eq!(store.len(), 1);
}

#[actix_rt::test]
async fn active_pin_is_driven_low() {
    let (state, backend, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/17")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    test::call_service(&app, req).await;
    let req = test::TestRequest::post()
        .uri("/gpios/18")
        .set_payload(r#"{"active":false}"#)
        .to_request();
    test::call_service(&app, req).await;

    assert_eq!(
        backend.writes(),
        vec![(17, Electrical::Low), (18, Electrical::High)]
    );
}

#[actix_rt::test]
async fn non_numeric_id_is_bad_request() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/abc")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("abc"));

    let req = test::TestRequest::get().uri("/gpios/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::get().uri("/gpios/-1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    assert!(backend.writes().is_empty());
    assert!(store.is_empty());
}

#[actix_rt::test]
async fn malformed_body_is_bad_request() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    for payload in ["not json", "", "{}", r#"{"active":"yes"}"#] {
        let req = test::TestRequest::post()
            .uri("/gpios/5")
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "payload {payload:?}");
    }

    assert!(backend.writes().is_empty());
    assert!(store.is_empty());
}

#[actix_rt::test]
async fn unknown_fields_are_ignored() {
    let (state, _, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/6")
        .set_payload(r#"{"active":true,"label":"relay"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(store.status(6).unwrap());
}

#[actix_rt::test]
async fn wrong_method_returns_405() {
    let (state, _, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::delete().uri("/gpios/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 405);
}

#[actix_rt::test]
async fn trailing_slash_is_normalized() {
    let (state, _, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/8/")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/gpios/8/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_active"], true);
}

#[actix_rt::test]
async fn routes_honor_base_path() {
    let (state, _, _) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state, "/api/v1");

    let req = test::TestRequest::get().uri("/api/v1/gpios/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get().uri("/gpios/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn hardware_failure_still_persists() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    backend.fail_pin(99);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/99")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(store.status(99).unwrap());
}

#[actix_rt::test]
async fn storage_failure_propagates_as_500() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    store.set_failing(true);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/2")
        .set_payload(r#"{"active":true}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    // the pin is still driven before the upsert is attempted
    assert_eq!(backend.level(2), Some(Electrical::Low));

    let req = test::TestRequest::get().uri("/gpios/2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_rt::test]
async fn storage_failure_ignored_when_configured() {
    let (state, _, store) = sample_state(StorageErrorPolicy::Ignore);
    store.upsert(2, true).unwrap();
    store.set_failing(true);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/gpios/2")
        .set_payload(r#"{"active":false}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get().uri("/gpios/2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "is_active": false }));
}

#[actix_rt::test]
async fn large_body_within_limit_is_accepted() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let pad = "x".repeat(300 * 1024);
    let req = test::TestRequest::post()
        .uri("/gpios/7")
        .set_json(json!({ "active": true, "pad": pad }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(store.status(7).unwrap());
    assert_eq!(backend.level(7), Some(Electrical::Low));
}

#[actix_rt::test]
async fn oversized_body_is_bad_request() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    let app = init_app!(state);

    let pad = "x".repeat(MAX_STATE_PAYLOAD);
    let req = test::TestRequest::post()
        .uri("/gpios/7")
        .set_json(json!({ "active": true, "pad": pad }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(backend.writes().is_empty());
    assert!(store.is_empty());
}

#[::core::prelude::v1::test]
fn concurrent_sets_keep_store_and_line_in_agreement() {
    let (state, backend, store) = sample_state(StorageErrorPolicy::Propagate);
    backend.set_settle_time(Duration::from_millis(2));

    thread::scope(|s| {
        for i in 0..16 {
            let state = state.clone();
            s.spawn(move || {
                for _ in 0..8 {
                    state.set_state(21, i % 2 == 0).unwrap();
                }
            });
        }
    });

    let expected = if store.status(21).unwrap() {
        Electrical::Low
    } else {
        Electrical::High
    };
    assert_eq!(backend.level(21), Some(expected));
    assert_eq!(backend.writes().len(), 16 * 8);
}
