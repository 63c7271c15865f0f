//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and SQL so route handlers can stay
//! focused on protocol translation and auth plumbing.

pub mod feed;
pub mod post;
pub mod session;
