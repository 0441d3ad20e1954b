//! Throwaway upstream HTTP servers for client tests

use std::time::Duration;

use actix_web::{web, App, HttpResponse, HttpServer};

use crate::models::ErrorResponse;
use crate::utils::RetryConfig;

/// Nothing listens on port 1; connects fail immediately
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub struct StubServer {
    pub base_url: String,
}

/// Bind a single-worker server on an ephemeral port and serve `configure`'s routes
pub async fn start<F>(configure: F) -> StubServer
where
    F: Fn(&mut web::ServiceConfig) + Clone + Send + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind stub server");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    StubServer {
        base_url: format!("http://{}", addr),
    }
}

pub fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(status).expect("valid status");
    HttpResponse::build(status).json(ErrorResponse {
        error_code: code.to_string(),
        error_message: message.to_string(),
    })
}

pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("build http client")
}

pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        multiplier: 2.0,
    }
}
