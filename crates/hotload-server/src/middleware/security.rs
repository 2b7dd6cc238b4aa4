//! Security headers for the status page.

use axum::http::HeaderValue;
use axum::http::header::{
    CONTENT_SECURITY_POLICY, HeaderName, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use tower_http::set_header::SetResponseHeaderLayer;

/// Content-Security-Policy for a self-contained page whose only script
/// opens a WebSocket.
const CSP: &str = "default-src 'none'; \
                   script-src 'unsafe-inline'; \
                   style-src 'unsafe-inline'; \
                   connect-src ws: wss:; \
                   frame-ancestors 'none'";

/// Headers set on every status page response.
const HEADERS: [(HeaderName, &str); 3] = [
    (CONTENT_SECURITY_POLICY, CSP),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "DENY"),
];

/// One overriding header layer per entry in [`HEADERS`].
pub(crate) fn header_layers() -> [SetResponseHeaderLayer<HeaderValue>; 3] {
    HEADERS.map(|(name, value)| {
        SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_value() {
        assert!(CSP.contains("default-src 'none'"));
        assert!(CSP.contains("script-src 'unsafe-inline'"));
        assert!(CSP.contains("connect-src ws: wss:"));
        assert!(CSP.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_header_names_are_distinct() {
        let [a, b, c] = HEADERS.map(|(name, _)| name);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
