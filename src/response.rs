//! The normalized result of a successful call.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Status, headers and body of a successful call.
///
/// Header names are in canonical form (`Content-Type`, `X-Request-Id`); a
/// header that appeared several times is reported once with its values
/// joined by `", "`. The body is the raw bytes
/// received, with no charset or content-type decoding applied.
///
/// # Examples
///
/// ```no_run
/// use reqexec::{execute, RequestConfig};
///
/// # async fn example() -> Result<(), reqexec::Error> {
/// let result = execute(&RequestConfig::new("https://api.example.com/status")).await?;
///
/// println!("Status: {}", result.response_code);
/// println!("Content-Type: {:?}", result.header("content-type"));
/// println!("Body: {}", result.text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestResult {
    /// The HTTP status code, verbatim.
    pub response_code: u16,

    /// Response headers, multi-valued headers joined with `", "`.
    pub response_headers: HashMap<String, String>,

    /// The raw response body.
    pub response_body: Vec<u8>,
}

impl RequestResult {
    pub(crate) fn from_response(response: http::Response<bytes::Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            response_code: parts.status.as_u16(),
            response_headers: join_headers(&parts.headers),
            response_body: body.to_vec(),
        }
    }

    /// Returns a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .get(&canonical_name(name))
            .map(String::as_str)
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.response_body).into_owned()
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] carrying the raw body if the
    /// body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.response_body).map_err(|e| {
            tracing::debug!(error = %e, "Failed to deserialize response body");
            Error::DeserializationFailed {
                raw_response: self.text(),
                serde_error: e.to_string(),
                status: StatusCode::from_u16(self.response_code).unwrap_or(StatusCode::OK),
            }
        })
    }
}

fn join_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut joined = HashMap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        joined.insert(canonical_name(name.as_str()), values.join(", "));
    }
    joined
}

/// Upper-cases the first letter of each `-`-separated segment and
/// lower-cases the rest.
fn canonical_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        canonical.push(if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() });
        upper = c == '-';
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;

    fn response_with(headers: &[(&str, &str)], body: &'static [u8]) -> http::Response<Bytes> {
        let mut builder = http::Response::builder().status(201);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::from_static(body)).unwrap()
    }

    #[test]
    fn test_multi_valued_headers_are_joined() {
        let result = RequestResult::from_response(response_with(
            &[("Set-Cookie", "a=1"), ("set-cookie", "b=2"), ("X-One", "only")],
            b"",
        ));

        assert_eq!(result.response_code, 201);
        assert_eq!(result.response_headers["Set-Cookie"], "a=1, b=2");
        assert_eq!(result.response_headers["X-One"], "only");
        assert_eq!(result.header("x-one"), Some("only"));
        assert_eq!(result.header("SET-COOKIE"), Some("a=1, b=2"));
        assert_eq!(result.response_headers.len(), 2);
    }

    #[test]
    fn test_canonical_header_names() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("x-request-id"), "X-Request-Id");
        assert_eq!(canonical_name("WWW-AUTHENTICATE"), "Www-Authenticate");
        assert_eq!(canonical_name("etag"), "Etag");
        assert_eq!(canonical_name("x--double"), "X--Double");
    }

    #[test]
    fn test_body_is_kept_raw() {
        let result = RequestResult::from_response(response_with(&[], b"\xff\x00{\"ok\":true}"));
        assert_eq!(result.response_body, b"\xff\x00{\"ok\":true}".to_vec());
    }

    #[test]
    fn test_json_helper() {
        #[derive(Deserialize)]
        struct Payload {
            ok: bool,
        }

        let result = RequestResult::from_response(response_with(&[], br#"{"ok":true}"#));
        assert!(result.json::<Payload>().unwrap().ok);

        let broken = RequestResult::from_response(response_with(&[], b"not json"));
        match broken.json::<Payload>() {
            Err(Error::DeserializationFailed { raw_response, status, .. }) => {
                assert_eq!(raw_response, "not json");
                assert_eq!(status.as_u16(), 201);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other.map(|_| ())),
        }
    }
}
