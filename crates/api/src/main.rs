use axum::{
    extract::Json,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use jscloak_transform::obfuscator::ObfuscationMetadata;
use jscloak_transform::plugin::{JavaScriptPlugin, TransformPlugin};
use jscloak_transform::{ObfuscationConfig, PassConfig, TransformMode, TransformOptions};
use jscloak_utils::errors::TransformError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Serialize)]
struct TransformRequest {
    /// JavaScript source text
    code: String,
    /// Transform options; omitted fields take their defaults
    options: Option<TransformOptions>,
    /// `obfuscate` (default) or `deobfuscate`
    mode: Option<TransformMode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransformResponse {
    /// Transformed source text
    code: String,
    /// Input size in bytes
    original_size: usize,
    /// Output size in bytes
    obfuscated_size: usize,
    /// Size increase percentage
    size_increase_percentage: f64,
    /// Wall time of the transform
    execution_time_ms: u64,
    metadata: ObfuscationMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

type ApiError = (StatusCode, ResponseJson<ErrorResponse>);

fn app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/defaults", get(defaults))
        .route("/transform", post(transform_code))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("jscloak API server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app()).await?;
    Ok(())
}

async fn health_check() -> ResponseJson<serde_json::Value> {
    ResponseJson(serde_json::json!({
        "status": "healthy",
        "service": "jscloak-api",
        "version": env!("CARGO_PKG_VERSION"),
        "modes": ["obfuscate", "deobfuscate"],
        "languages": [JavaScriptPlugin.name()]
    }))
}

async fn defaults() -> ResponseJson<TransformOptions> {
    ResponseJson(JavaScriptPlugin.default_options())
}

async fn transform_code(
    Json(request): Json<TransformRequest>,
) -> Result<ResponseJson<TransformResponse>, ApiError> {
    let start_time = std::time::Instant::now();
    let mode = request.mode.unwrap_or_default();
    info!("Received {} request for {} bytes", mode, request.code.len());

    let config = ObfuscationConfig {
        options: request
            .options
            .unwrap_or_else(|| JavaScriptPlugin.default_options()),
        mode,
        pass_config: PassConfig::default(),
    };

    match JavaScriptPlugin.transform(config, request.code).await {
        Ok(result) => {
            let execution_time = start_time.elapsed();
            info!(
                "{} completed in {}ms, size: {} -> {} bytes ({:.1}% increase)",
                mode,
                execution_time.as_millis(),
                result.original_size,
                result.obfuscated_size,
                result.size_increase_percentage
            );
            Ok(ResponseJson(TransformResponse {
                code: result.code,
                original_size: result.original_size,
                obfuscated_size: result.obfuscated_size,
                size_increase_percentage: result.size_increase_percentage,
                execution_time_ms: execution_time.as_millis() as u64,
                metadata: result.metadata,
            }))
        }
        Err(e) => {
            error!("{} failed: {}", mode, e);
            Err(error_response(mode, &e))
        }
    }
}

/// Input errors are the caller's fault; anything else is ours.
fn error_response(mode: TransformMode, err: &TransformError) -> ApiError {
    let status = match err {
        TransformError::Parse(_) => StatusCode::BAD_REQUEST,
        TransformError::Unsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let error = match mode {
        TransformMode::Obfuscate => "Obfuscation failed",
        TransformMode::Deobfuscate => "Deobfuscation failed",
    };
    (
        status,
        ResponseJson(ErrorResponse {
            error: error.to_string(),
            details: Some(err.to_string()),
        }),
    )
}
