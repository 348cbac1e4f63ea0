use log::error;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, guard, http::Method, web};
use serde::{Deserialize, Serialize};

use crate::config::StorageErrorPolicy;
use crate::error::AppError;
use crate::gpio::{GpioBackend, PinController, PinLocks};
use crate::store::StateStore;

/// Largest set-state body accepted before answering 400.
pub const MAX_STATE_PAYLOAD: usize = 4 * 1024 * 1024;

pub struct AppState<B: GpioBackend, S: StateStore> {
    pub controller: Arc<PinController<B>>,
    pub store: Arc<S>,
    pub locks: Arc<PinLocks>,
    pub storage_errors: StorageErrorPolicy,
}

impl<B: GpioBackend, S: StateStore> Clone for AppState<B, S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            storage_errors: self.storage_errors,
        }
    }
}

#[derive(Deserialize)]
struct StatePayload {
    active: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    is_active: bool,
}

impl<B: GpioBackend, S: StateStore> AppState<B, S> {
    pub fn new(
        controller: Arc<PinController<B>>,
        store: Arc<S>,
        storage_errors: StorageErrorPolicy,
    ) -> Self {
        Self {
            controller,
            store,
            locks: Arc::new(PinLocks::default()),
            storage_errors,
        }
    }

    /// Drive the pin, then persist the requested state. The hardware result
    /// does not gate persistence.
    pub fn set_state(&self, pin_id: u32, active: bool) -> Result<(), AppError> {
        let _pin = self.locks.lock(pin_id);

        if let Err(e) = self.controller.set_level(pin_id, active) {
            error!("failed to drive gpio {pin_id}: {e}");
        }

        self.store
            .upsert(pin_id, active)
            .or_else(|e| self.storage_failure(e))
    }

    pub fn get_state(&self, pin_id: u32) -> Result<bool, AppError> {
        self.store
            .status(pin_id)
            .or_else(|e| self.storage_failure(e).map(|_| false))
    }

    fn storage_failure(&self, e: AppError) -> Result<(), AppError> {
        match self.storage_errors {
            StorageErrorPolicy::Ignore => {
                error!("{e}");
                Ok(())
            }
            StorageErrorPolicy::Propagate => Err(e),
        }
    }
}

impl<B: GpioBackend + 'static, S: StateStore + 'static> AppState<B, S> {
    pub fn api_scope(&self, base_path: &str) -> actix_web::Scope {
        web::scope(base_path).service(
            web::resource("/gpios/{id}")
                .route(web::get().to(get_state::<B, S>))
                .route(web::post().to(set_state::<B, S>))
                .route(
                    web::route()
                        .guard(guard_not_methods(&[Method::GET, Method::POST]))
                        .to(method_not_allowed),
                ),
        )
    }
}

async fn set_state<B: GpioBackend + 'static, S: StateStore + 'static>(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState<B, S>>,
) -> Result<impl Responder, AppError> {
    let pin_id = parse_pin_id(&req)?;
    let body = body
        .to_bytes_limited(MAX_STATE_PAYLOAD)
        .await
        .map_err(|e| AppError::InvalidPayload(format!("State payload too large: {e}")))?
        .map_err(|e| AppError::InvalidPayload(format!("Failed to read state payload: {e}")))?;
    let payload = parse_state_payload(&body)?;

    let state = state.get_ref().clone();
    web::block(move || state.set_state(pin_id, payload.active))
        .await
        .map_err(|e| AppError::Blocking(e.to_string()))??;

    Ok(HttpResponse::Ok().finish())
}

async fn get_state<B: GpioBackend + 'static, S: StateStore + 'static>(
    req: HttpRequest,
    state: web::Data<AppState<B, S>>,
) -> Result<impl Responder, AppError> {
    let pin_id = parse_pin_id(&req)?;

    let state = state.get_ref().clone();
    let is_active = web::block(move || state.get_state(pin_id))
        .await
        .map_err(|e| AppError::Blocking(e.to_string()))??;

    Ok(web::Json(StatusResponse { is_active }))
}

fn parse_pin_id(req: &HttpRequest) -> Result<u32, AppError> {
    let raw = req
        .match_info()
        .get("id")
        .ok_or_else(|| AppError::InvalidPinId("Missing pin id".into()))?;

    raw.parse::<u32>()
        .map_err(|e| AppError::InvalidPinId(format!("Invalid pin id {raw:?}: {e}")))
}

fn parse_state_payload(body: &[u8]) -> Result<StatePayload, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidPayload(format!("Invalid state payload: {e}")))
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
