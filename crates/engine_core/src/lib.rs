//! Core types shared by the range simulation crates.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform and its raw matrix form handed to the renderer
//! - Frame time and the fixed-step accumulator
//! - Health and the opaque visual handle

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
