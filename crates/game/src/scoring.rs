//! Score and combo tracking.

use crate::config::ScoringConfig;

/// Ordered hit-count → multiplier thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboTable {
    thresholds: Vec<(u32, f32)>,
}

impl ComboTable {
    /// Thresholds are sorted by hit count on construction.
    pub fn new(mut thresholds: Vec<(u32, f32)>) -> Self {
        thresholds.sort_by_key(|(hits, _)| *hits);
        Self { thresholds }
    }

    /// Multiplier of the highest threshold `consecutive_hits` reaches, 1.0 below the first.
    pub fn multiplier_for(&self, consecutive_hits: u32) -> f32 {
        self.thresholds
            .iter()
            .take_while(|(hits, _)| consecutive_hits >= *hits)
            .last()
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(1.0)
    }
}

/// What one scoring call changed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreEvent {
    pub delta: i64,
    pub multiplier: f32,
    pub consecutive_hits: u32,
    /// Health the player loses for this hit.
    pub player_damage: f32,
    /// The combo was running and got broken.
    pub combo_reset: bool,
}

/// Round score and combo state.
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    pub score: i64,
    pub consecutive_hits: u32,
    pub max_consecutive_hits: u32,
    combo_multiplier: f32,
    table: ComboTable,
    partial_hit_fraction: f32,
    penalty_damage: f32,
}

impl ScoreBoard {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            score: 0,
            consecutive_hits: 0,
            max_consecutive_hits: 0,
            combo_multiplier: 1.0,
            table: ComboTable::new(config.combo_thresholds.clone()),
            partial_hit_fraction: config.partial_hit_fraction,
            penalty_damage: config.penalty_damage,
        }
    }

    /// Always derived from `consecutive_hits`.
    pub fn combo_multiplier(&self) -> f32 {
        self.combo_multiplier
    }

    /// Score a hit on a target worth `points`.
    ///
    /// * destroyed, positive: combo +1, add points × multiplier
    /// * damaged, positive: add the partial fraction, combo untouched
    /// * negative: add the points whatever happened to the target, break the
    ///   combo and hurt the player
    pub fn register_hit(&mut self, points: i64, destroyed: bool) -> ScoreEvent {
        let mut event = ScoreEvent::default();

        if points > 0 {
            if destroyed {
                self.consecutive_hits += 1;
                self.max_consecutive_hits = self.max_consecutive_hits.max(self.consecutive_hits);
                self.combo_multiplier = self.table.multiplier_for(self.consecutive_hits);
                event.delta = (points as f64 * self.combo_multiplier as f64).round() as i64;
            } else {
                event.delta = (points as f64 * self.partial_hit_fraction as f64).round() as i64;
            }
        } else if points < 0 {
            event.delta = points;
            event.combo_reset = self.consecutive_hits > 0;
            event.player_damage = self.penalty_damage;
            self.reset_combo();
        }

        self.score += event.delta;
        event.multiplier = self.combo_multiplier;
        event.consecutive_hits = self.consecutive_hits;
        event
    }

    /// A shot that hit no target. Returns true if a running combo was broken.
    pub fn register_miss(&mut self) -> bool {
        let broke = self.consecutive_hits > 0;
        self.reset_combo();
        broke
    }

    fn reset_combo(&mut self) {
        self.consecutive_hits = 0;
        self.combo_multiplier = 1.0;
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.max_consecutive_hits = 0;
        self.reset_combo();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> ScoreBoard {
        ScoreBoard::new(&ScoringConfig::default())
    }

    #[test]
    fn multiplier_picks_highest_reached_threshold() {
        let table = ComboTable::new(ScoringConfig::default().combo_thresholds);
        assert_eq!(table.multiplier_for(0), 1.0);
        assert_eq!(table.multiplier_for(4), 1.0);
        assert_eq!(table.multiplier_for(5), 1.5);
        assert_eq!(table.multiplier_for(14), 2.0);
        assert_eq!(table.multiplier_for(100), 3.0);
    }

    #[test]
    fn multiplier_never_drops_as_hits_grow() {
        let table = ComboTable::new(ScoringConfig::default().combo_thresholds);
        let mut last = 0.0;
        for hits in 0..40 {
            let m = table.multiplier_for(hits);
            assert!(m >= last);
            last = m;
        }
    }

    #[test]
    fn first_kill_scores_base_points() {
        let mut score = board();
        let event = score.register_hit(10, true);
        assert_eq!(event.delta, 10);
        assert_eq!(score.score, 10);
        assert_eq!(score.consecutive_hits, 1);
        assert_eq!(score.combo_multiplier(), 1.0);
    }

    #[test]
    fn fifth_kill_is_multiplied() {
        let mut score = board();
        for _ in 0..4 {
            score.register_hit(10, true);
        }
        let event = score.register_hit(30, true);
        assert_eq!(event.multiplier, 1.5);
        assert_eq!(event.delta, 45);
        assert_eq!(score.score, 85);
    }

    #[test]
    fn partial_hit_leaves_combo_alone() {
        let mut score = board();
        score.register_hit(10, true);
        let event = score.register_hit(5, false);
        assert_eq!(event.delta, 1);
        assert_eq!(score.consecutive_hits, 1);
    }

    #[test]
    fn penalty_resets_combo_and_hurts() {
        let mut score = board();
        for _ in 0..6 {
            score.register_hit(10, true);
        }
        let event = score.register_hit(-20, true);
        assert!(event.combo_reset);
        assert_eq!(event.player_damage, 15.0);
        assert_eq!(score.consecutive_hits, 0);
        assert_eq!(score.combo_multiplier(), 1.0);
        assert_eq!(score.max_consecutive_hits, 6);
    }

    #[test]
    fn score_can_go_negative() {
        let mut score = board();
        score.register_hit(-20, true);
        score.register_hit(-20, false);
        assert_eq!(score.score, -40);
    }

    #[test]
    fn miss_only_touches_the_combo() {
        let mut score = board();
        score.register_hit(10, true);
        score.register_hit(10, true);
        assert!(score.register_miss());
        assert_eq!(score.score, 20);
        assert_eq!(score.consecutive_hits, 0);
        assert!(!score.register_miss());
    }
}
