use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed response envelope: {0}")]
    Malformed(String),
    #[error("response is missing the {0:?} field")]
    MissingField(&'static str),
    #[error("unexpected response status {0:?}")]
    UnexpectedStatus(String),
    #[error("server reported a {error_type:?} error: {message}")]
    Server { error_type: String, message: String },
    #[error("unsupported result type {0:?}")]
    UnsupportedResultType(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueParseError {
    #[error("sample value {0:?} is not a float token")]
    Value(String),
    #[error("sample timestamp {0} is outside the representable range")]
    Timestamp(f64),
}

#[derive(Debug, Error)]
pub enum PromqlError {
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Value(#[from] ValueParseError),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PromqlError>;
