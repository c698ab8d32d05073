//! Planet chat: a single-room chat backend with file uploads, plus the
//! polling client used by `chat-cli`.

pub mod client;
pub mod config;
pub mod message;
pub mod routes;
pub mod services;
pub mod state;
