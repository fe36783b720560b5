//! Response headers applied to every route.
//!
//! The CORS values are fixed and deliberately permissive so that pages served
//! from here can be fetched from any origin during local testing.

use axum::http::{header, HeaderName, HeaderValue};

pub const ALLOW_ORIGIN: (HeaderName, HeaderValue) = (
    header::ACCESS_CONTROL_ALLOW_ORIGIN,
    HeaderValue::from_static("*"),
);

pub const ALLOW_METHODS: (HeaderName, HeaderValue) = (
    header::ACCESS_CONTROL_ALLOW_METHODS,
    HeaderValue::from_static("GET, POST, OPTIONS"),
);

pub const ALLOW_HEADERS: (HeaderName, HeaderValue) = (
    header::ACCESS_CONTROL_ALLOW_HEADERS,
    HeaderValue::from_static("*"),
);

/// All headers added to every response, in the order they are applied.
pub const CORS_HEADERS: [(HeaderName, HeaderValue); 3] =
    [ALLOW_ORIGIN, ALLOW_METHODS, ALLOW_HEADERS];
