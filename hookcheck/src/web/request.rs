//! The request as received, before any interpretation.

use axum::http::{HeaderMap, HeaderName, Method};
use bytes::Bytes;

/// Method, headers and the exact body bytes of one inbound request.
///
/// The body is whatever the transport read, untouched: no trimming, no charset
/// handling, no JSON decoding. It is immutable for the life of the request.
#[derive(Debug, Clone)]
pub struct RawRequest {
    method: Method,
    headers: HeaderMap,
    body: Bytes,
}

impl RawRequest {
    pub fn new(method: Method, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// First value of a header. A value that is not visible ASCII comes back
    /// as an empty string, which never decodes as a signature.
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .map(|value| value.to_str().unwrap_or_default())
    }

    pub fn into_parts(self) -> (Method, HeaderMap, Bytes) {
        (self.method, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Signature", HeaderValue::from_static("abc123"));
        let request = RawRequest::new(Method::POST, headers, Bytes::new());

        let name = HeaderName::from_bytes(b"x-SIGNATURE").unwrap();
        assert_eq!(request.header_str(&name), Some("abc123"));
        assert_eq!(request.header_str(&HeaderName::from_static("x-other")), None);
    }

    #[test]
    fn test_opaque_header_value_is_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("x-signature", HeaderValue::from_bytes(b"\xffab").unwrap());
        let request = RawRequest::new(Method::POST, headers, Bytes::new());

        assert_eq!(request.header_str(&HeaderName::from_static("x-signature")), Some(""));
    }

    #[test]
    fn test_body_is_kept_verbatim() {
        let raw = Bytes::from_static(b"  {\"b\":1,\"a\":2}\r\n");
        let request = RawRequest::new(Method::POST, HeaderMap::new(), raw.clone());
        assert_eq!(request.body(), &raw[..]);

        let (_, _, body) = request.into_parts();
        assert_eq!(body, raw);
    }
}
