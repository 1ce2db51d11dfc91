use crate::error::TileError;
use crate::server::api::{self, ApiError};
use crate::server::AppContext;

pub struct HttpResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn ok(content_type: &'static str, body: String) -> Self {
        HttpResponse {
            status_code: 200,
            content_type,
            body,
        }
    }
}

pub fn route_request(ctx: &AppContext, method: &str, path: &str, body: &str) -> HttpResponse {
    let (route, query) = path.split_once('?').unwrap_or((path, ""));
    let segments: Vec<&str> = route.split('/').filter(|segment| !segment.is_empty()).collect();

    let result = match (method, segments.as_slice()) {
        ("GET", ["api", "health"]) => api::health_payload(ctx),
        ("GET", ["api", "help"]) => api::help_payload(ctx, query),
        ("POST", ["api", "reports"]) => api::submit_report_payload(ctx, body),
        ("GET", ["api", "tiles"]) => api::missing_location_payload(ctx, query),
        ("GET", ["api", "tiles", location]) => api::tile_payload(ctx, location, query),
        ("GET", ["api", "tiles", location, "text"]) => {
            api::tile_text_payload(ctx, location, query)
        }
        ("GET", ["api", "export"]) => {
            return match api::export_payload(ctx, query) {
                Ok(csv) => HttpResponse::ok("text/csv; charset=utf-8", csv),
                Err(err) => api_error_response(err),
            };
        }
        ("GET", ["api", "messages", name]) => api::message_payload(ctx, name, query),
        ("PUT", ["api", "users", user_id, "language"]) => {
            api::set_language_payload(ctx, user_id, body)
        }
        ("PUT", ["api", "users", user_id, "authorization"]) => {
            api::authorize_payload(ctx, user_id)
        }
        _ => return error_response(404, "Route not found"),
    };

    match result {
        Ok(payload) => HttpResponse::ok("application/json", payload),
        Err(err) => api_error_response(err),
    }
}

fn api_error_response(err: ApiError) -> HttpResponse {
    match err {
        ApiError::Parse(err) => error_response(400, &format!("Invalid request body: {err}")),
        ApiError::BadRequest(message) => error_response(400, &message),
        ApiError::UserState(err) => error_response(500, &err.to_string()),
        ApiError::MissingLocation(message) => {
            coded_error_response(400, "provide_location", &message)
        }
        ApiError::Tile {
            source,
            code,
            message,
        } => {
            let status_code = match source {
                TileError::Unauthorized(_) => 403,
                TileError::NotForwarded | TileError::InvalidReport => 422,
                TileError::LocationNotFound(_) => 404,
                TileError::StoreLoad { .. }
                | TileError::Persistence { .. }
                | TileError::MalformedTimestamp(_) => 500,
            };
            coded_error_response(status_code, code, &message)
        }
    }
}

fn coded_error_response(status_code: u16, code: &str, message: &str) -> HttpResponse {
    let fallback =
        "{\n  \"status\": \"error\",\n  \"message\": \"Unknown error\"\n}".to_string();
    let body = serde_json::to_string_pretty(&serde_json::json!({
        "status": "error",
        "code": code,
        "message": message,
    }))
    .unwrap_or(fallback);

    HttpResponse {
        status_code,
        content_type: "application/json",
        body,
    }
}

pub fn error_response(status_code: u16, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}
