//! Network layer: the JSON API client used in api mode.
//!
//! [`HttpClient`] wraps `reqwest` with the conventions the backend speaks:
//! a versioned `/api/v1` base path, bearer-token auth sourced from the
//! active session, `{ "data": ... }` response envelopes, and an error body
//! carrying `message` plus optional field-level `errors`. A `401` clears
//! client-side session state before the error reaches the caller.

pub mod client;

pub use client::{ApiError, HttpClient, TokenCell};
