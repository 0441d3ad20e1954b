use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, Responder, ResponseError};
use futures_util::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::order::{OrderId, OrderService};
use crate::errors::OrderServiceError;
use crate::health::{HealthCheckable, SystemHealth};
use crate::metrics::Metrics;
use crate::models::PlaceOrderRequest;

// ============================================================================
// HTTP API
// ============================================================================
//
// POST /order/placeOrder   -> 201 + order id
// GET  /order/{order_id}   -> aggregated order view
// GET  /metrics            -> Prometheus text format
// GET  /health             -> 200 unless a component is unhealthy (503)
//
// Every failure is rendered as {"errorCode", "errorMessage"} with the status
// carried by the error itself.
//
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
    pub metrics: Arc<Metrics>,
    pub health: Vec<Arc<dyn HealthCheckable>>,
}

impl ResponseError for OrderServiceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_response())
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        OrderServiceError::InvalidRequest(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        OrderServiceError::InvalidRequest(err.to_string()).into()
    }))
    .route("/order/placeOrder", web::post().to(place_order))
    .route("/order/{order_id}", web::get().to(get_order))
    .route("/metrics", web::get().to(metrics_handler))
    .route("/health", web::get().to(health_handler));
}

pub async fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    tracing::info!("🌐 Starting order API on http://{}:{}", host, port);

    let data = web::Data::new(state);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind((host, port))?
        .run()
        .await
}

async fn place_order(
    state: web::Data<AppState>,
    request: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, OrderServiceError> {
    let span = tracing::info_span!("place_order", request_id = %Uuid::now_v7());
    let service = state.service.clone();
    let request = request.into_inner();

    // Detached so a client disconnect cannot stop the workflow between its
    // two store writes
    let placement = actix_web::rt::spawn(
        async move { service.place_order(&request).await }.instrument(span),
    );
    let order_id = placement.await.map_err(|e| {
        tracing::error!(error = %e, "Order placement task failed");
        OrderServiceError::internal()
    })??;

    Ok(HttpResponse::Created().json(order_id))
}

async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<OrderId>,
) -> Result<HttpResponse, OrderServiceError> {
    let order_id = path.into_inner();
    let span = tracing::info_span!("get_order", request_id = %Uuid::now_v7(), order_id);
    let view = state.service.get_order(order_id).instrument(span).await?;

    Ok(HttpResponse::Ok().json(view))
}

async fn metrics_handler(state: web::Data<AppState>) -> impl Responder {
    match state.metrics.encode() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    let components = join_all(state.health.iter().map(|c| c.check_health())).await;
    let health = SystemHealth::from_components(components);

    if health.status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(health)
    } else {
        HttpResponse::Ok().json(health)
    }
}
