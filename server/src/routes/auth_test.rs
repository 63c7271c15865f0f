use super::*;
use axum::http::HeaderValue;
use axum::http::header::COOKIE;

fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    map
}

#[test]
fn session_token_reads_bearer_header() {
    let map = headers(&[(AUTHORIZATION, "Bearer abc123")]);
    assert_eq!(session_token(&map).as_deref(), Some("abc123"));
}

#[test]
fn session_token_reads_cookie() {
    let map = headers(&[(COOKIE, "theme=dark; session_token=from-cookie")]);
    assert_eq!(session_token(&map).as_deref(), Some("from-cookie"));
}

#[test]
fn session_token_prefers_header_over_cookie() {
    let map = headers(&[(AUTHORIZATION, "Bearer from-header"), (COOKIE, "session_token=from-cookie")]);
    assert_eq!(session_token(&map).as_deref(), Some("from-header"));
}

#[test]
fn session_token_ignores_blank_and_non_bearer() {
    assert_eq!(session_token(&headers(&[(AUTHORIZATION, "Bearer   ")])), None);
    assert_eq!(session_token(&headers(&[(AUTHORIZATION, "Basic dXNlcjpwYXNz")])), None);
    assert_eq!(session_token(&headers(&[(COOKIE, "session_token=")])), None);
    assert_eq!(session_token(&HeaderMap::new()), None);
}
