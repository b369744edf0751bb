//! API 错误到 HTTP 状态码的映射，响应体为 `{"detail": "..."}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::DftkitError;

#[derive(Debug)]
pub enum ApiError {
    /// 库内错误
    Dftkit(DftkitError),
    /// 查询参数超出范围
    Validation(String),
    /// 工作线程失败等服务端问题
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Dftkit(DftkitError::MissingApiKey) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Dftkit(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::Dftkit(e) => e.to_string(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Internal(e) => format!("{:#}", e),
        }
    }
}

impl From<DftkitError> for ApiError {
    fn from(e: DftkitError) -> Self {
        ApiError::Dftkit(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::Error::new(e).context("worker task failed"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self.detail());
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(DftkitError::MissingApiKey).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(DftkitError::NoResults("Xx".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_detail_is_message() {
        let err = ApiError::from(DftkitError::InvalidArgument("Unsupported material: ZnO".into()));
        assert_eq!(err.detail(), "Invalid argument: Unsupported material: ZnO");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
