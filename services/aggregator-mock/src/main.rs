use std::sync::Arc;

use aggregator_mock::{
    MockRuntime,
    config::{MockConfig, TransportRuntime},
    transport::serve_http_with_workers,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match MockConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("aggregator-mock configuration error: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(&config);

    let runtime = match MockRuntime::from_config(&config) {
        Ok(runtime) => Arc::new(runtime),
        Err(err) => {
            tracing::error!(error = %err, data_dir = %config.data_dir.display(), "startup failed");
            std::process::exit(1);
        }
    };

    let engine = runtime.engine();
    tracing::info!(
        bind_addr = %config.bind_addr,
        api_prefix = %runtime.api_prefix(),
        fixtures = engine.store().len(),
        organizations = engine.catalog().len(),
        changing_clusters = engine.rotation().len(),
        http_workers = config.http_workers,
        transport_runtime = %config.transport_runtime,
        "aggregator mock starting"
    );
    tracing::info!(
        "health endpoint: http://{}/health, API root: http://{}{}",
        config.bind_addr,
        config.bind_addr,
        runtime.api_prefix()
    );

    match config.transport_runtime {
        TransportRuntime::Std => {
            if let Err(err) = serve_http_with_workers(runtime, &config.bind_addr, config.http_workers)
            {
                tracing::error!(error = %err, "transport failed");
                std::process::exit(1);
            }
        }
        TransportRuntime::Axum => {
            #[cfg(feature = "async-transport")]
            {
                if let Err(err) = aggregator_mock::transport_axum::serve_http_with_axum(
                    runtime,
                    &config.bind_addr,
                    config.http_workers,
                ) {
                    tracing::error!(error = %err, "transport failed");
                    std::process::exit(1);
                }
            }
            #[cfg(not(feature = "async-transport"))]
            {
                tracing::error!(
                    "transport runtime 'axum' requires build feature 'async-transport'"
                );
                std::process::exit(2);
            }
        }
    }
}

/// `RUST_LOG` wins when set; otherwise the debug setting picks the level.
fn init_tracing(config: &MockConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
