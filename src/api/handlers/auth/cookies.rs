//! Header plumbing for the refresh cookie and bearer tokens.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE},
};

use crate::auth::{AuthError, cookie::REFRESH_COOKIE_NAME, cookie::RefreshCookie};

/// Render a refresh cookie as a `Set-Cookie` value.
pub(super) fn set_cookie_value(cookie: &RefreshCookie) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("invalid Set-Cookie value: {err}")))
}

pub(super) fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == REFRESH_COOKIE_NAME {
                let val = val.trim();
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn refresh_cookie_is_found_among_others() {
        let headers = headers(COOKIE, "theme=dark; refreshToken=abc.def.ghi; lang=en");
        assert_eq!(extract_refresh_cookie(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn empty_or_missing_refresh_cookie_is_none() {
        assert_eq!(extract_refresh_cookie(&headers(COOKIE, "refreshToken=")), None);
        assert_eq!(extract_refresh_cookie(&headers(COOKIE, "theme=dark")), None);
        assert_eq!(extract_refresh_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert_eq!(
            extract_bearer_token(&headers(AUTHORIZATION, "Bearer tok")),
            Some("tok".to_string())
        );
        assert_eq!(extract_bearer_token(&headers(AUTHORIZATION, "Basic Zm9v")), None);
        assert_eq!(extract_bearer_token(&headers(AUTHORIZATION, "Bearer ")), None);
    }
}
