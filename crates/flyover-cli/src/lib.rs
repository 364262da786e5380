//! Flyover CLI - command line tools for route fly-over animations.
//!
//! This crate provides:
//! - play_route: fly a route against a headless, logging renderer

pub mod config;
pub mod renderer;
pub mod routes;

pub use config::Config;
pub use renderer::{TraceMarker, TraceRenderer};
pub use routes::{circular_route, random_route, straight_route};
