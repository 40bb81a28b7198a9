use axum::{
    Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, Request, Response, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::any,
};

use crate::{
    SharedRuntime,
    transport::{HttpRequest, HttpResponse, MAX_HTTP_BODY_BYTES, handle_request},
};

#[derive(Clone)]
struct AppState {
    runtime: SharedRuntime,
}

/// Serves every request through the shared router on a multi-threaded tokio
/// runtime with `worker_threads` workers.
pub fn serve_http_with_axum(
    runtime: SharedRuntime,
    bind_addr: &str,
    worker_threads: usize,
) -> Result<(), String> {
    let worker_threads = worker_threads.max(1);
    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build tokio runtime: {e}"))?;

    let bind_addr = bind_addr.to_string();
    tokio_runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;
        tracing::info!(bind_addr = %bind_addr, worker_threads, "axum transport listening");

        axum::serve(listener, router(runtime))
            .await
            .map_err(|e| format!("axum server failed: {e}"))
    })
}

fn router(runtime: SharedRuntime) -> Router {
    Router::new()
        .fallback(any(dispatch))
        .with_state(AppState { runtime })
        .layer(axum::extract::DefaultBodyLimit::max(MAX_HTTP_BODY_BYTES))
}

async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> impl IntoResponse {
    let response = match into_transport_request(request).await {
        Ok(request) => handle_request(&state.runtime, &request),
        Err(rejection) => rejection,
    };
    response_from_transport(response)
}

async fn into_transport_request(request: Request<Body>) -> Result<HttpRequest, HttpResponse> {
    let (parts, body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path(), |target| target.as_str());

    let mut out = HttpRequest::new(parts.method.as_str(), target);
    for (name, value) in &parts.headers {
        // Non-visible-ASCII values are dropped; no route reads them.
        if let Ok(value) = value.to_str() {
            out.insert_header(name.as_str(), value);
        }
    }

    let body = to_bytes(body, MAX_HTTP_BODY_BYTES).await.map_err(|err| {
        tracing::debug!(error = %err, "request body rejected");
        HttpResponse::bad_request(&format!("request body error: {err}"))
    })?;
    Ok(out.with_body(body.to_vec()))
}

fn response_from_transport(response: HttpResponse) -> Response<Body> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !response.carries_body() {
        let mut out = Response::new(Body::empty());
        *out.status_mut() = status;
        return out;
    }
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;
    out.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(response.content_type),
    );
    out
}
