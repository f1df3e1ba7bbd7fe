//! HTTP Basic authentication carrying upstream credentials.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use vaultgate_upstream::Credentials;

use crate::jsonrpc::{JsonRpcResponse, UNAUTHORIZED};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,
    #[error("Authorization scheme is not Basic")]
    WrongScheme,
    #[error("Basic credentials are not valid base64 UTF-8")]
    Malformed,
    #[error("Basic credentials must be client_id:secret with both parts non-empty")]
    Incomplete,
}

/// Extract `client_id:secret` from `Authorization: Basic ...`.
///
/// The split is at the first `:`, so secrets may contain colons.
pub fn parse_basic_auth(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Malformed)?;

    let (scheme, encoded) = value.trim().split_once(' ').ok_or(AuthError::WrongScheme)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::WrongScheme);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;

    match decoded.split_once(':') {
        Some((client_id, secret)) if !client_id.is_empty() && !secret.is_empty() => {
            Ok(Credentials::new(client_id, secret))
        }
        _ => Err(AuthError::Incomplete),
    }
}

/// 401 with a Basic challenge and a JSON-RPC error body.
pub fn unauthorized() -> Response {
    let body = JsonRpcResponse::error(Value::Null, UNAUTHORIZED, "Unauthorized");
    let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"MCP\""),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    fn basic(raw: &str) -> HeaderMap {
        headers(&format!("Basic {}", STANDARD.encode(raw)))
    }

    #[test]
    fn test_parse_valid() {
        let creds = parse_basic_auth(&basic("client_1:s3cret")).unwrap();
        assert_eq!(creds.client_id, "client_1");
        assert_eq!(creds.secret(), "s3cret");
    }

    #[test]
    fn test_secret_may_contain_colon() {
        let creds = parse_basic_auth(&basic("id:a:b")).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.secret(), "a:b");
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert_eq!(parse_basic_auth(&HeaderMap::new()), Err(AuthError::Missing));
        assert_eq!(
            parse_basic_auth(&headers("Bearer abc")),
            Err(AuthError::WrongScheme)
        );
        assert_eq!(
            parse_basic_auth(&headers("Basic !!!not-base64")),
            Err(AuthError::Malformed)
        );
        assert_eq!(parse_basic_auth(&basic("nocolon")), Err(AuthError::Incomplete));
        assert_eq!(parse_basic_auth(&basic(":secret")), Err(AuthError::Incomplete));
        assert_eq!(parse_basic_auth(&basic("id:")), Err(AuthError::Incomplete));
    }

    #[test]
    fn test_unauthorized_challenge() {
        let resp = unauthorized();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"MCP\""
        );
    }
}
