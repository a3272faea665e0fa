use axum::http::{header::AUTHORIZATION, HeaderMap};


/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, HeaderError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(HeaderError::Missing)?
        .to_str()
        .map_err(|_| HeaderError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Like [`extract_bearer_token`], but an absent header is `Ok(None)`.
///
/// Used where authentication is optional (OAuth callback). A header that is
/// present but malformed is still an error.
pub fn optional_bearer_token(headers: &HeaderMap) -> Result<Option<String>, HeaderError> {
    match extract_bearer_token(headers) {
        Ok(token) => Ok(Some(token)),
        Err(HeaderError::Missing) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse "Bearer <token>" (scheme is case-insensitive)
pub fn parse_bearer_token(header_value: &str) -> Result<String, HeaderError> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(HeaderError::InvalidFormat);
    }

    if !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(HeaderError::InvalidFormat);
    }

    let token = parts[1].trim();
    if token.is_empty() {
        return Err(HeaderError::Empty);
    }

    Ok(token.to_string())
}

/// Authorization header errors
#[derive(Debug, PartialEq, Clone)]
pub enum HeaderError {
    /// Authorization header not present
    Missing,
    /// Not "Bearer <token>" or not valid header text
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderError::Missing => {
                write!(f, "Please make sure your request has an Authorization header")
            }
            HeaderError::InvalidFormat => write!(f, "Invalid authorization header format"),
            HeaderError::Empty => write!(f, "Authorization token is empty"),
        }
    }
}

impl std::error::Error for HeaderError {}
