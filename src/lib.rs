pub mod api;
pub mod app;
pub mod config;
pub mod display;
pub mod model;
pub mod router;
/// Process-wide credential store, optionally backed by a session file.
pub mod session;
pub mod screens;
