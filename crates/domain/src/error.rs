/// Shared error type used across all MDK crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("config: {0}")]
    Config(String),

    #[error("client is stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_cause() {
        let err = Error::Timeout("no node for service1 1.0".into());
        assert_eq!(err.to_string(), "timeout: no node for service1 1.0");
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
