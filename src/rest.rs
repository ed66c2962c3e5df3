use anyhow::Result;
use axum::{routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::calculator::{json_number, CalculateRequest};
use crate::config::RestConfig;

/// `result` is a number on success and an `"Error: ..."` string otherwise.
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub result: Value,
}

pub async fn calculate(Json(request): Json<CalculateRequest>) -> Json<CalculateResponse> {
    let result = match request.evaluate() {
        Ok(value) => json_number(value),
        Err(e) => {
            warn!(operation = %request.operation, error = %e, "calculation rejected");
            Value::String(format!("Error: {e}"))
        }
    };
    Json(CalculateResponse { result })
}

pub fn router(config: &RestConfig) -> Result<Router> {
    // メソッドとヘッダーはリクエストの内容をそのまま許可する
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([config.origin_header()?]))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Ok(Router::new().route("/calculate", post(calculate)).layer(cors))
}
