//! Usage: Unified application error model (maps internal failures to `CODE: message` strings).

pub type AppResult<T> = Result<T, AppError>;

/// Failure families surfaced to callers. The code prefix of an [`AppError`] selects the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or expired grant, invalid client credentials, unreachable realm/shard at login.
    Auth,
    /// OAuth state mismatch on a captured redirect.
    Security,
    /// HTTP failure, timeout, or malformed response body.
    Network,
    /// Opaque failure raised by the document transfer collaborator.
    Transfer,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Auth => "AUTH_ERROR",
            Self::Security => "SECURITY_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Transfer => "TRANSFER_ERROR",
            Self::InvalidInput => "SEC_INVALID_INPUT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    fn from_code(code: &str) -> Self {
        match code {
            "AUTH_ERROR" => Self::Auth,
            "SECURITY_ERROR" => Self::Security,
            "NETWORK_ERROR" => Self::Network,
            "TRANSFER_ERROR" => Self::Transfer,
            "SEC_INVALID_INPUT" => Self::InvalidInput,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn of_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind.code(), message)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(&self.code)
    }
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(':')?;
    let code = maybe_code.trim();
    if code.is_empty() {
        return None;
    }
    let mut chars = code.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AppError::new(code.to_string(), message.to_string());
        }
        AppError::new("INTERNAL_ERROR", value)
    }
}

impl From<&'static str> for AppError {
    fn from(value: &'static str) -> Self {
        AppError::from(value.to_string())
    }
}

impl From<AppError> for String {
    fn from(value: AppError) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_with_code_prefix_maps_to_kind() {
        let err: AppError = "SECURITY_ERROR: oauth redirect state mismatch".into();
        assert_eq!(err.kind(), ErrorKind::Security);
        assert_eq!(err.message(), "oauth redirect state mismatch");
        assert_eq!(err.to_string(), "SECURITY_ERROR: oauth redirect state mismatch");
    }

    #[test]
    fn plain_string_falls_back_to_internal() {
        let err: AppError = "something broke".into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn lowercase_prefix_is_not_a_code() {
        let err: AppError = format!("oops: {}", 42).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "oops: 42");
    }

    #[test]
    fn unknown_code_keeps_code_but_reports_internal() {
        let err: AppError = "DB_NOT_FOUND: missing".into();
        assert_eq!(err.code(), "DB_NOT_FOUND");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
