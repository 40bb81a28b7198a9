mod http;
mod request;
mod routes;
mod server_runtime;

#[cfg(test)]
mod tests;

pub(crate) use http::{HttpRequest, HttpResponse};
use http::render_response_text;
use request::read_http_request;
pub use server_runtime::serve_http_with_workers;

use crate::MockRuntime;

pub(crate) const MAX_HTTP_BODY_BYTES: usize = 1024 * 1024;

/// Parses one raw HTTP/1.1 request, routes it and renders the response
/// bytes. Used by tests that skip the socket layer.
pub fn handle_http_request_bytes(
    runtime: &MockRuntime,
    raw_request: &[u8],
) -> Result<Vec<u8>, String> {
    let mut reader = raw_request;
    let request = read_http_request(&mut reader)?
        .ok_or_else(|| "missing request line".to_string())?;
    if !reader.is_empty() {
        return Err("content-length does not match body size".to_string());
    }
    let response = handle_request(runtime, &request);
    Ok(render_response_text(&response).into_bytes())
}

pub(crate) fn handle_request(runtime: &MockRuntime, request: &HttpRequest) -> HttpResponse {
    routes::handle_request(runtime, request)
}
