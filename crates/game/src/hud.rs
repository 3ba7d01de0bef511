//! Read-only data handed to the UI: a per-frame snapshot and discrete events.

use engine_core::Vec3;

use crate::state::{GameOverReason, SessionState};
use crate::target::{TargetId, TargetKind};

/// Published once when a round ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalResult {
    pub score: i64,
    pub max_combo: u32,
    pub reason: GameOverReason,
}

/// Everything the HUD shows for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub state: SessionState,
    pub score: i64,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reserve_ammo: u32,
    pub reloading: bool,
    /// 0..1 while reloading.
    pub reload_progress: f32,
    pub health: f32,
    pub max_health: f32,
    /// Seconds, never negative.
    pub time_left: f32,
    pub combo_multiplier: f32,
    pub consecutive_hits: u32,
    pub max_consecutive_hits: u32,
    pub active_targets: usize,
    pub final_result: Option<FinalResult>,
}

impl HudSnapshot {
    /// "MM:SS" countdown.
    pub fn time_display(&self) -> String {
        let total = self.time_left.max(0.0).ceil() as u32;
        format!("{:02}:{:02}", total / 60, total % 60)
    }

    pub fn ammo_display(&self) -> String {
        if self.reloading {
            format!("RELOADING... {}", self.reserve_ammo)
        } else {
            format!("{} / {}", self.ammo, self.reserve_ammo)
        }
    }

    /// Shown only once the combo carries a bonus.
    pub fn combo_display(&self) -> Option<String> {
        if self.combo_multiplier > 1.0 {
            Some(format!("x{:.1} ({} hits)", self.combo_multiplier, self.consecutive_hits))
        } else {
            None
        }
    }
}

/// Things the UI reacts to once (screens, markers, floating score).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    StateChanged { from: SessionState, to: SessionState },
    /// A target was struck: show a hit marker and the score change.
    TargetHit { id: TargetId, kind: TargetKind, destroyed: bool, score_delta: i64, point: Vec3 },
    Missed { combo_broken: bool },
    TargetSpawned { id: TargetId, kind: TargetKind },
    /// Left the play volume without being destroyed.
    TargetLost { id: TargetId, kind: TargetKind },
    ComboChanged { consecutive_hits: u32, multiplier: f32 },
    PlayerDamaged { amount: f32, health: f32 },
    ReloadStarted,
    ReloadFinished,
    GameOver(FinalResult),
}
