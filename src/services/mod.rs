//! Storage services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the on-disk formats so route handlers can stay
//! focused on request validation and status mapping.

pub mod messages;
pub mod uploads;
