use actix_web::{
    http::{header::ToStrError as HEADER_TO_STR_ERROR, StatusCode},
    HttpResponse, ResponseError,
};
use base64::DecodeError as BASE64_DECODE_ERROR;
use ece::Error as ECE_ERROR;
use jsonwebtoken::errors::Error as JWT_ERROR;
use reqwest::{
    header::{
        InvalidHeaderName as INVALID_HEADER_NAME,
        InvalidHeaderValue as INVALID_HEADER_VALUE,
    },
    Error as REQWEST_ERROR,
};
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    Base64DecodeError(#[from] BASE64_DECODE_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    HeaderToStrError(#[from] HEADER_TO_STR_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    InvalidHeaderName(#[from] INVALID_HEADER_NAME),

    #[error("{0}")]
    InvalidHeaderValue(#[from] INVALID_HEADER_VALUE),

    #[error("{0}")]
    JwtError(#[from] JWT_ERROR),

    #[error("Encrypt push payload: {0}")]
    EceError(#[from] ECE_ERROR),

    #[error("Invalid option: {option}")]
    InvalidOption { option: String },

    #[error("InvalidHeader error: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Method not allowed")]
    MethodNotAllowed(),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match &self {
            Error::Validation(_) | Error::HeaderToStrError(_) => {
                StatusCode::BAD_REQUEST
            },
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::MethodNotAllowed() => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
