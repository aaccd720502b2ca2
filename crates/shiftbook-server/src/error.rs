// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidCredentials,
    Unauthorized,
    ValidationFailed,
    InvalidQueryParameter,
    NotFound,
    StoreUnavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

pub(crate) fn error_json(code: ApiErrorCode, message: &str, details: Value) -> ApiError {
    ApiError {
        code,
        message: message.to_string(),
        details,
    }
}

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({"error": err}));
    (status, body).into_response()
}

impl ApiError {
    pub(crate) fn unauthorized() -> Response {
        api_error_response(
            StatusCode::UNAUTHORIZED,
            error_json(ApiErrorCode::Unauthorized, "login required", Value::Null),
        )
    }

    pub(crate) fn store(err: &crate::store::StoreError) -> Response {
        api_error_response(
            StatusCode::BAD_GATEWAY,
            error_json(
                ApiErrorCode::StoreUnavailable,
                "spreadsheet backend unavailable",
                json!({"reason": err.to_string()}),
            ),
        )
    }

    pub(crate) fn validation(message: &str) -> Response {
        api_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            error_json(ApiErrorCode::ValidationFailed, message, Value::Null),
        )
    }

    pub(crate) fn invalid_param(name: &str, value: &str) -> Response {
        api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidQueryParameter,
                &format!("invalid query parameter: {name}"),
                json!({"parameter": name, "value": value}),
            ),
        )
    }

    pub(crate) fn not_found(message: &str) -> Response {
        api_error_response(
            StatusCode::NOT_FOUND,
            error_json(ApiErrorCode::NotFound, message, Value::Null),
        )
    }
}
