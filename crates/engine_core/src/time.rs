//! Time management for the frame loop.

use std::time::Instant;

/// Largest frame delta passed on to the simulation, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    /// Wall-clock instant of the last `tick`.
    last_frame: Option<Instant>,
    /// Clamped delta of the last frame, in seconds.
    delta: f32,
    /// Total simulated time since start.
    elapsed: f64,
    /// Frame count since start.
    frame_count: u64,
    /// Upper bound for a single frame delta.
    max_delta: f32,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_DELTA)
    }

    pub fn with_max_delta(max_delta: f32) -> Self {
        Self {
            last_frame: None,
            delta: 0.0,
            elapsed: 0.0,
            frame_count: 0,
            max_delta: max_delta.max(0.0),
        }
    }

    /// Sample the wall clock and advance by the time since the previous tick.
    /// The first tick yields a zero delta.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = match self.last_frame {
            Some(prev) => (now - prev).as_secs_f32(),
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.advance(raw)
    }

    /// Advance by an externally measured delta. Negative, NaN and oversized
    /// deltas (tab switches, debugger stops) are clamped.
    pub fn advance(&mut self, raw_delta: f32) -> f32 {
        let dt = if raw_delta.is_finite() {
            raw_delta.clamp(0.0, self.max_delta)
        } else {
            0.0
        };
        self.delta = dt;
        self.elapsed += dt as f64;
        self.frame_count += 1;
        dt
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta > 0.0 {
            1.0 / self.delta
        } else {
            0.0
        }
    }
}

/// How many fixed increments a frame may run, and how much wall time was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepBudget {
    pub substeps: u32,
    pub dropped: f32,
}

/// Fixed-timestep accumulator with a hard substep cap.
#[derive(Debug, Clone, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `wall_dt` to the accumulator and take out as many `step` increments
    /// as fit, at most `max_substeps`. When the cap is hit the whole-step part
    /// of the remainder is dropped so a slow frame never snowballs.
    pub fn consume(&mut self, step: f32, wall_dt: f32, max_substeps: u32) -> StepBudget {
        if !(step > 0.0) || !wall_dt.is_finite() {
            return StepBudget::default();
        }
        self.accumulator += wall_dt.max(0.0);

        let mut substeps = 0;
        while self.accumulator >= step && substeps < max_substeps {
            self.accumulator -= step;
            substeps += 1;
        }

        let mut dropped = 0.0;
        if self.accumulator >= step {
            let kept = self.accumulator % step;
            dropped = self.accumulator - kept;
            self.accumulator = kept;
        }
        StepBudget { substeps, dropped }
    }

    /// Leftover time that has not yet been stepped.
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    #[test]
    fn advance_clamps_long_frames() {
        let mut time = Time::new();
        assert_eq!(time.advance(3.0), DEFAULT_MAX_DELTA);
        assert_eq!(time.advance(-1.0), 0.0);
        assert_eq!(time.advance(f32::NAN), 0.0);
        assert_eq!(time.frame_count(), 3);
    }

    #[test]
    fn fixed_step_runs_whole_increments() {
        let mut clock = FixedStep::new();
        let budget = clock.consume(STEP, STEP * 2.5, 5);
        assert_eq!(budget.substeps, 2);
        assert_eq!(budget.dropped, 0.0);
        assert!((clock.pending() - STEP * 0.5).abs() < 1e-6);
    }

    #[test]
    fn fixed_step_caps_substeps_and_drops_excess() {
        let mut clock = FixedStep::new();
        let budget = clock.consume(STEP, 1.0, 5);
        assert_eq!(budget.substeps, 5);
        assert!(budget.dropped > 0.0);
        assert!(clock.pending() < STEP);
    }

    #[test]
    fn fixed_step_ignores_bad_step() {
        let mut clock = FixedStep::new();
        assert_eq!(clock.consume(0.0, 1.0, 5).substeps, 0);
        assert_eq!(clock.pending(), 0.0);
    }
}
