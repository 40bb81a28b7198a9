use std::{collections::HashMap, io::Write, net::TcpStream, time::Duration};

use serde::Serialize;

use crate::api::StatusResponse;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const BACKPRESSURE_QUEUE_FULL_MESSAGE: &str = "service unavailable: worker queue full";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpRequest {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Vec<u8>,
}

impl HttpRequest {
    pub(crate) fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Header names are stored lowercase; a repeated header keeps the last value.
    pub(crate) fn insert_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub(crate) fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) content_type: &'static str,
    pub(crate) body: String,
}

impl HttpResponse {
    pub(crate) fn ok_json(body: String) -> Self {
        Self::json(200, body)
    }

    pub(crate) fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body,
        }
    }

    /// Serializes `value` as the body; a serializer failure becomes a 500.
    pub(crate) fn serialized<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::json(status, body),
            Err(err) => {
                tracing::error!(error = %err, "response serialization failed");
                Self::internal_server_error("response serialization failed")
            }
        }
    }

    /// `{"status": message}` with the given status code.
    pub(crate) fn error_with_status(status: u16, message: &str) -> Self {
        Self::serialized(status, &StatusResponse { status: message })
    }

    pub(crate) fn bad_request(message: &str) -> Self {
        Self::error_with_status(400, message)
    }

    pub(crate) fn forbidden(message: &str) -> Self {
        Self::error_with_status(403, message)
    }

    pub(crate) fn not_found(message: &str) -> Self {
        Self::error_with_status(404, message)
    }

    pub(crate) fn method_not_allowed(message: &str) -> Self {
        Self::error_with_status(405, message)
    }

    pub(crate) fn service_unavailable(message: &str) -> Self {
        Self::error_with_status(503, message)
    }

    pub(crate) fn internal_server_error(message: &str) -> Self {
        Self::json(
            500,
            format!("{{\"status\":\"{}\"}}", message.replace('"', "\\\"")),
        )
    }

    /// 204 and 304 responses end at the header block.
    pub(crate) fn carries_body(&self) -> bool {
        !matches!(self.status, 204 | 304)
    }
}

pub(crate) fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        100..=199 => "Informational",
        200..=299 => "Success",
        300..=399 => "Redirection",
        400..=499 => "Client Error",
        _ => "Server Error",
    }
}

pub(crate) fn backpressure_rejection_response() -> HttpResponse {
    HttpResponse::service_unavailable(BACKPRESSURE_QUEUE_FULL_MESSAGE)
}

pub(crate) fn write_backpressure_response(
    mut stream: TcpStream,
    socket_timeout_secs: u64,
) -> std::io::Result<()> {
    stream.set_write_timeout(Some(Duration::from_secs(socket_timeout_secs)))?;
    let response = backpressure_rejection_response();
    stream.write_all(render_response_text(&response).as_bytes())
}

pub(crate) fn write_response(
    stream: &mut TcpStream,
    response: &HttpResponse,
) -> std::io::Result<()> {
    stream.write_all(render_response_text(response).as_bytes())?;
    stream.flush()
}

pub(crate) fn render_response_text(response: &HttpResponse) -> String {
    let status_line = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    if !response.carries_body() {
        return format!("{status_line}Connection: close\r\n\r\n");
    }
    format!(
        "{status_line}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.content_type,
        response.body.len(),
        response.body
    )
}
