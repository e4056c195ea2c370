use tracing::warn;

use crate::config::EngineConfig;
use crate::parallel::WorkerPool;
use crate::server::api;

pub struct HttpResponse {
    pub status_code: u16,
    pub status_text: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn json(body: String) -> Self {
        Self {
            status_code: 200,
            status_text: "OK",
            content_type: "application/json",
            body,
        }
    }

    pub fn to_http_string(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status_code,
            self.status_text,
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

/// Routes a request with configuration read from the environment.
pub fn route_request(method: &str, path: &str, body: &str) -> HttpResponse {
    route_request_with_config(method, path, body, &EngineConfig::from_env())
}

pub fn route_request_with_config(
    method: &str,
    path: &str,
    body: &str,
    config: &EngineConfig,
) -> HttpResponse {
    route_request_with_pool(method, path, body, config, &WorkerPool::from_config(config))
}

/// Routes a request onto an already built simulation pool.
pub fn route_request_with_pool(
    method: &str,
    path: &str,
    body: &str,
    config: &EngineConfig,
    pool: &WorkerPool,
) -> HttpResponse {
    let path = path.split('?').next().unwrap_or(path);
    match (method, path) {
        ("GET", "/api/health") => match api::health_payload() {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
        },
        ("GET", "/api/modifiers") => match api::modifiers_payload() {
            Ok(payload) => HttpResponse::json(payload),
            Err(err) => error_response(500, "Internal Server Error", &err.to_string()),
        },
        ("POST", "/api/stats") => api_result(api::stats_payload(body)),
        ("POST", "/api/simulate") => api_result(api::simulate_payload(body, config, pool)),
        _ => error_response(404, "Not Found", "Route not found"),
    }
}

fn api_result(result: Result<String, api::ApiError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse::json(payload),
        Err(err) => {
            warn!(error = %err, "request rejected");
            error_response(400, "Bad Request", &err.to_string())
        }
    }
}

fn error_response(status_code: u16, status_text: &'static str, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        status_text,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
