//! Guarded, multi-step ad submission workflow.
//!
//! The engine covers the access gate, the step navigator, the avatar and video
//! media lanes, submission validation and commit, and the moderation watcher.
//! Rendering, routing and storage live with the host.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
