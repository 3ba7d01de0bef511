//! Shooting-range simulation core.
//!
//! A [`Session`] owns one round: the physics world, player movement, the
//! weapon, the target manager and scoring, plus the render and audio
//! collaborators it reports to. Drive it with [`Session::frame`] once per
//! display refresh and feed it device events in between.

pub mod arena;
pub mod collab;
pub mod config;
pub mod error;
pub mod events;
pub mod hud;
pub mod player;
pub mod scoring;
pub mod session;
pub mod spawner;
pub mod state;
pub mod target;
pub mod update;
pub mod weapons;

pub use collab::{NullRenderer, RenderSink};
pub use config::GameConfig;
pub use error::SessionError;
pub use hud::{FinalResult, HudSnapshot, SessionEvent};
pub use session::Session;
pub use state::SessionState;
pub use target::{TargetId, TargetKind};
