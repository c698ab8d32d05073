//! Chat client: HTTP API wrapper, poll-and-merge timeline, send paths.
//!
//! ARCHITECTURE
//! ============
//! `api` speaks the JSON API. `timeline` is pure state: it merges fetched
//! snapshots with optimistic local entries. `poller` drives fetches on an
//! interval. `session` ties them together for one named user and is what a
//! front end talks to.

pub mod api;
pub mod poller;
pub mod session;
pub mod timeline;
