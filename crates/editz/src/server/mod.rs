use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::prelude::{eprintln, *};

pub mod cli;
pub mod handlers;
pub mod models;

const BYTES_PER_MB: usize = 1024 * 1024;

pub async fn run(options: cli::ServeOptions, global: crate::Global) -> Result<()> {
    let addr = format!("{}:{}", options.host, options.port);
    let app_router = router(&options)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("editz backend listening on http://{}", addr);
    if global.verbose {
        eprintln!("Upload endpoint: http://{}/upload-pdf", addr);
        eprintln!("Edit endpoint: http://{}/pdf/{{file_id}}/edit", addr);
        eprintln!("Download endpoint: http://{}/pdf/{{file_id}}/download", addr);
    }

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

pub fn router(options: &cli::ServeOptions) -> Result<Router> {
    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/upload-pdf", post(handlers::upload_pdf))
        .route("/pdf/{file_id}/edit", post(handlers::edit_pdf))
        .route("/pdf/{file_id}/download", post(handlers::download_pdf))
        .layer(DefaultBodyLimit::max(options.max_upload_mb * BYTES_PER_MB))
        .layer(cors(options.allow_origin.as_deref())?))
}

fn cors(allow_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match allow_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .map_err(|e| eyre!("Invalid allowed origin '{}': {}", origin, e))?;
            layer.allow_origin(origin)
        }
        None => layer.allow_origin(Any),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(allow_origin: Option<&str>) -> cli::ServeOptions {
        cli::ServeOptions {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_mb: 1,
            allow_origin: allow_origin.map(str::to_string),
        }
    }

    #[test]
    fn test_router_builds() {
        assert!(router(&options(None)).is_ok());
        assert!(router(&options(Some("http://localhost:3000"))).is_ok());
    }

    #[test]
    fn test_invalid_origin_rejected() {
        assert!(router(&options(Some("bad\norigin"))).is_err());
    }
}
