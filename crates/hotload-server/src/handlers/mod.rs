//! HTTP request handlers.

pub(crate) mod status;
