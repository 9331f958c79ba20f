use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind carried in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::BadGateway(_) => "BAD_GATEWAY",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let msg = e.to_string();
        match e {
            DomainError::NotFound(_) => AppError::NotFound(msg),
            DomainError::Forbidden(_) => AppError::Forbidden(msg),
            DomainError::InvalidInput(_) | DomainError::EmptyCart => AppError::BadRequest(msg),
            DomainError::InsufficientStock { .. } | DomainError::Conflict(_) => {
                AppError::Conflict(msg)
            }
            DomainError::Unauthorized(_) => AppError::Unauthorized(msg),
            DomainError::Gateway(_) => AppError::BadGateway(msg),
            DomainError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;
    use uuid::Uuid;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_error_body_hides_detail() {
        let resp = AppError::Internal("password column missing".to_string()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "INTERNAL_SERVER_ERROR");
        assert_eq!(json["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn body_carries_kind_and_message() {
        let resp = AppError::from(DomainError::EmptyCart).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "BAD_REQUEST");
        assert_eq!(json["message"], "Cart is empty");
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn domain_errors_map_to_taxonomy() {
        let cases: Vec<(DomainError, StatusCode)> = vec![
            (DomainError::not_found("Product"), StatusCode::NOT_FOUND),
            (DomainError::forbidden(), StatusCode::FORBIDDEN),
            (DomainError::invalid("bad value"), StatusCode::BAD_REQUEST),
            (DomainError::EmptyCart, StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientStock {
                    product_id: Uuid::new_v4(),
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::Conflict("dup".to_string()), StatusCode::CONFLICT),
            (
                DomainError::Unauthorized("bad token".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (DomainError::Gateway("down".to_string()), StatusCode::BAD_GATEWAY),
            (
                DomainError::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (domain, status) in cases {
            let label = domain.to_string();
            assert_eq!(AppError::from(domain).status_code(), status, "{label}");
        }
    }
}
