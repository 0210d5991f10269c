use axum::http::StatusCode;
use thiserror::Error;

pub const TRANSIENT_NOTICE: &str = "Something went wrong, please try again.";

/// Failures raised by the habit core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HabitError {
    /// User input rejected; the message is shown verbatim.
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("store error: {0}")]
    Store(String),
    #[error("auth error: {0}")]
    Auth(String),
}

impl HabitError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type HabitResult<T> = Result<T, HabitError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Please log in to access this page.".to_string(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<HabitError> for AppError {
    fn from(err: HabitError) -> Self {
        match err {
            HabitError::Validation(message) => Self::bad_request(message),
            HabitError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            HabitError::Store(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: TRANSIENT_NOTICE.to_string(),
            },
            HabitError::Auth(_) => Self::internal(err),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
