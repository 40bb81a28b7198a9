use std::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex, mpsc},
    time::Duration,
};

use super::{
    HttpResponse, handle_request,
    http::{write_backpressure_response, write_response},
    read_http_request,
};
use crate::{MockRuntime, SharedRuntime};

const SOCKET_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HTTP_QUEUE_CAPACITY_PER_WORKER: usize = 64;

/// Blocking accept loop feeding a fixed pool of worker threads through a
/// bounded queue. Connections arriving while the queue is full get a 503.
pub fn serve_http_with_workers(
    runtime: SharedRuntime,
    bind_addr: &str,
    worker_count: usize,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr)?;
    let worker_count = worker_count.max(1);
    let queue_capacity = resolve_http_queue_capacity(worker_count);
    let (tx, rx) = mpsc::sync_channel::<TcpStream>(queue_capacity);
    let rx = Arc::new(Mutex::new(rx));
    tracing::info!(
        bind_addr,
        workers = worker_count,
        queue_capacity,
        "std transport listening"
    );

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let runtime = Arc::clone(&runtime);
            let rx = Arc::clone(&rx);
            scope.spawn(move || {
                loop {
                    let stream = {
                        let guard = match rx.lock() {
                            Ok(guard) => guard,
                            Err(_) => break,
                        };
                        match guard.recv() {
                            Ok(stream) => stream,
                            Err(_) => break,
                        }
                    };
                    if let Err(err) = handle_connection(&runtime, stream) {
                        tracing::warn!(error = %err, "transport connection error");
                    }
                }
            });
        }

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => match tx.try_send(stream) {
                    Ok(()) => {}
                    Err(mpsc::TrySendError::Full(stream)) => {
                        tracing::warn!(queue_capacity, "worker queue full, rejecting connection");
                        if let Err(err) = write_backpressure_response(stream, SOCKET_TIMEOUT_SECS) {
                            tracing::warn!(error = %err, "backpressure response failed");
                        }
                    }
                    Err(mpsc::TrySendError::Disconnected(_)) => {
                        tracing::error!("transport worker queue closed");
                        break;
                    }
                },
                Err(err) => tracing::warn!(error = %err, "transport accept error"),
            }
        }
        drop(tx);
    });

    Ok(())
}

fn handle_connection(runtime: &MockRuntime, mut stream: TcpStream) -> std::io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)))?;
    stream.set_write_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)))?;

    let parsed = {
        let mut reader = BufReader::new(&mut stream);
        read_http_request(&mut reader)
    };
    let request = match parsed {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(err) => {
            tracing::debug!(error = %err, "rejecting malformed request");
            return write_response(&mut stream, &HttpResponse::bad_request(&err));
        }
    };

    let response = handle_request(runtime, &request);
    write_response(&mut stream, &response)
}

pub(super) fn resolve_http_queue_capacity(worker_count: usize) -> usize {
    worker_count
        .max(1)
        .saturating_mul(DEFAULT_HTTP_QUEUE_CAPACITY_PER_WORKER)
}
