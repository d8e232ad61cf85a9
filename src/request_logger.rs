use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Data, Request, Response};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Per-request id, taken from the client's `X-Request-Id` when present.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Fairing to log one line per HTTP request with timing and request id
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
        request.local_cache(|| request_id_for(request));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let duration = request.local_cache(Instant::now).elapsed();
        let RequestId(id) = request.local_cache(|| request_id_for(request));

        response.set_header(Header::new(REQUEST_ID_HEADER, id.clone()));

        log::info!("{}", request_line(request, response.status().code, duration, id));
    }
}

/// `METHOD PATH -> STATUS (ms) [id]`. Query strings are never logged.
fn request_line(request: &Request<'_>, status: u16, duration: Duration, id: &str) -> String {
    format!(
        "{} {} -> {} ({:.2}ms) [{}]",
        request.method(),
        request.uri().path(),
        status,
        duration.as_secs_f64() * 1000.0,
        id
    )
}

fn request_id_for(request: &Request<'_>) -> RequestId {
    let supplied = request
        .headers()
        .get_one(REQUEST_ID_HEADER)
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= 128);

    RequestId(
        supplied
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    )
}
