//! JSON-RPC 2.0 endpoint.
//!
//! The method name selects the operation and `params` carries the two operands
//! positionally. Every reply, including error envelopes, is sent with HTTP 200.

use axum::{
    body::Bytes,
    http::{header, Method},
    routing::{post, MethodRouter},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::calculator::{json_number, CalcError, Operation};

pub const JSONRPC_VERSION: &str = "2.0";

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Incoming envelope. The `jsonrpc` version member is not checked.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Anything other than a known method name string is reported as -32601.
    #[serde(default)]
    pub method: Option<Value>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    #[serde(flatten)]
    pub payload: ResponsePayload,
    pub id: Value,
}

impl Response {
    pub fn result(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: ResponsePayload::Result(result),
            id,
        }
    }

    pub fn error(error: RpcError, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: ResponsePayload::Error(error.into()),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("Parse error")]
    Parse,

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Method not found")]
    MethodNotFound,

    #[error("{0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse => error_codes::PARSE_ERROR,
            RpcError::InvalidRequest => error_codes::INVALID_REQUEST,
            RpcError::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            RpcError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

impl From<RpcError> for ErrorObject {
    fn from(error: RpcError) -> Self {
        ErrorObject {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<CalcError> for RpcError {
    fn from(error: CalcError) -> Self {
        match error {
            CalcError::UnknownOperation(_) => RpcError::MethodNotFound,
            CalcError::DivisionByZero => RpcError::Internal(error.to_string()),
        }
    }
}

fn operands(params: &Value) -> Result<(f64, f64), RpcError> {
    let Value::Array(items) = params else {
        return Err(RpcError::Internal(
            "Invalid params: expected an array of 2 numbers".to_string(),
        ));
    };

    if items.len() != 2 {
        return Err(RpcError::Internal(format!(
            "Invalid params: expected 2 positional parameters, got {}",
            items.len()
        )));
    }

    let operand = |i: usize| {
        items[i].as_f64().ok_or_else(|| {
            RpcError::Internal(format!("Invalid params: parameter {i} is not a number"))
        })
    };
    Ok((operand(0)?, operand(1)?))
}

fn call(request: &Request) -> Result<Value, RpcError> {
    // メソッド名の確認を先に行う。未知のメソッドは params に関係なく -32601
    let op: Operation = request
        .method
        .as_ref()
        .and_then(Value::as_str)
        .ok_or(RpcError::MethodNotFound)?
        .parse()?;
    let (a, b) = operands(&request.params)?;
    let value = op.apply(a, b)?;
    Ok(json_number(value))
}

/// Dispatches a parsed request to the calculator.
pub fn dispatch(request: &Request) -> Response {
    match call(request) {
        Ok(result) => {
            debug!(method = ?request.method, id = %request.id, "call succeeded");
            Response::result(result, request.id.clone())
        }
        Err(e) => {
            warn!(method = ?request.method, id = %request.id, code = e.code(), error = %e, "call failed");
            Response::error(e, request.id.clone())
        }
    }
}

/// Parses a raw request body and dispatches it.
///
/// The request id is echoed back whenever it can be recovered from the body.
pub fn handle_body(body: &[u8]) -> Response {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable request body");
            return Response::error(RpcError::Parse, Value::Null);
        }
    };

    if !value.is_object() {
        warn!("request body is not a JSON object");
        return Response::error(RpcError::InvalidRequest, Value::Null);
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<Request>(value) {
        Ok(request) => dispatch(&request),
        Err(e) => {
            warn!(error = %e, "invalid request envelope");
            Response::error(RpcError::InvalidRequest, id)
        }
    }
}

async fn handle(body: Bytes) -> Json<Response> {
    Json(handle_body(&body))
}

pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // パスは問わない。OPTIONS は CorsLayer がそのまま 200 で返す
    let endpoint: MethodRouter = post(handle);
    Router::new()
        .route("/", endpoint.clone())
        .route("/{*path}", endpoint)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn request(method: &str, params: Value, id: Value) -> Request {
        Request {
            method: Some(json!(method)),
            params,
            id,
        }
    }

    fn to_json(response: &Response) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_dispatch_divide() {
        let response = dispatch(&request("divide", json!([10, 2]), json!(1)));
        assert_eq!(
            to_json(&response),
            json!({"jsonrpc": "2.0", "result": 5, "id": 1})
        );
    }

    #[test]
    fn test_dispatch_all_methods() {
        let cases = [
            ("add", json!(7)),
            ("subtract", json!(3)),
            ("multiply", json!(10)),
            ("divide", json!(2.5)),
        ];
        for (method, expected) in cases {
            let response = dispatch(&request(method, json!([5, 2]), json!("abc")));
            assert_eq!(
                response,
                Response::result(expected, json!("abc")),
                "method {method}"
            );
        }
    }

    #[test]
    fn test_dispatch_unknown_method() {
        let response = dispatch(&request("modulo", json!([10, 2]), json!(2)));
        assert_eq!(
            to_json(&response),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": 2
            })
        );

        // params が壊れていても未知のメソッドが優先
        let response = dispatch(&request("modulo", json!("junk"), json!(3)));
        assert_eq!(
            response,
            Response::error(RpcError::MethodNotFound, json!(3))
        );
    }

    #[test]
    fn test_dispatch_division_by_zero() {
        let response = dispatch(&request("divide", json!([1, 0]), json!(9)));
        assert_eq!(
            to_json(&response),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32603, "message": "Division by zero"},
                "id": 9
            })
        );
    }

    #[test]
    fn test_dispatch_malformed_params() {
        let cases = [
            (json!([1]), "Invalid params: expected 2 positional parameters, got 1"),
            (json!([1, 2, 3]), "Invalid params: expected 2 positional parameters, got 3"),
            (json!([1, "2"]), "Invalid params: parameter 1 is not a number"),
            (json!([null, 2]), "Invalid params: parameter 0 is not a number"),
            (json!({"a": 1, "b": 2}), "Invalid params: expected an array of 2 numbers"),
            (Value::Null, "Invalid params: expected an array of 2 numbers"),
        ];
        for (params, message) in cases {
            let response = dispatch(&request("add", params, json!(4)));
            assert_eq!(
                response.payload,
                ResponsePayload::Error(ErrorObject {
                    code: error_codes::INTERNAL_ERROR,
                    message: message.to_string(),
                })
            );
            assert_eq!(response.id, json!(4));
        }
    }

    #[test]
    fn test_handle_body_parse_error() {
        let response = handle_body(b"{not json");
        assert_eq!(
            to_json(&response),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32700, "message": "Parse error"},
                "id": null
            })
        );
    }

    #[test]
    fn test_handle_body_missing_or_odd_method_is_not_found() {
        let response = handle_body(br#"{"jsonrpc": "2.0", "params": [1, 2], "id": 5}"#);
        assert_eq!(
            to_json(&response),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": 5
            })
        );

        for body in [
            br#"{"method": null, "params": [1, 2], "id": 6}"#.as_slice(),
            br#"{"method": 42, "params": [1, 2], "id": 6}"#.as_slice(),
            br#"{"method": ["add"], "params": [1, 2], "id": 6}"#.as_slice(),
        ] {
            let response = handle_body(body);
            assert_eq!(response, Response::error(RpcError::MethodNotFound, json!(6)));
        }
    }

    #[test]
    fn test_handle_body_ignores_version_member() {
        let response = handle_body(br#"{"jsonrpc": 2, "method": "add", "params": [1, 2], "id": 8}"#);
        assert_eq!(response, Response::result(json!(3), json!(8)));
    }

    #[test]
    fn test_handle_body_non_object_is_invalid_request() {
        for body in [b"[1, 2]".as_slice(), b"\"add\"".as_slice(), b"null".as_slice()] {
            let response = handle_body(body);
            assert_eq!(response, Response::error(RpcError::InvalidRequest, Value::Null));
        }

        // 配列形式の「リクエスト」も受け付けない
        let response = handle_body(br#"["add", [1, 2], 1]"#);
        assert_eq!(response, Response::error(RpcError::InvalidRequest, Value::Null));
    }

    #[test]
    fn test_handle_body_missing_id_is_null() {
        let response = handle_body(br#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2]}"#);
        assert_eq!(response, Response::result(json!(3), Value::Null));
    }

    async fn post(uri: &str, body: &str) -> axum::response::Response {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::from(body.to_string()))
            .unwrap();
        router().oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_http_success_and_error_are_200() {
        let response = post("/", r#"{"jsonrpc":"2.0","method":"divide","params":[10,2],"id":1}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            body_json(response).await,
            json!({"jsonrpc": "2.0", "result": 5, "id": 1})
        );

        let response = post("/", r#"{"jsonrpc":"2.0","method":"modulo","params":[10,2],"id":2}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": 2
            })
        );
    }

    #[tokio::test]
    async fn test_http_any_path() {
        let response = post("/rpc/v1", r#"{"jsonrpc":"2.0","method":"add","params":[1,1],"id":"x"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"jsonrpc": "2.0", "result": 2, "id": "x"})
        );
    }

    #[tokio::test]
    async fn test_http_preflight() {
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("POST") && methods.contains("OPTIONS"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_http_plain_options() {
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap();
        assert!(methods.contains("POST") && methods.contains("OPTIONS"));
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
