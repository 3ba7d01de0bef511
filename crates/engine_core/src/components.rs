//! Common components used across the simulation.

/// Health component for damageable entities (the player and targets).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Subtract `amount`, never going below zero. Non-positive amounts and
    /// hits on an already empty pool do nothing. Returns true only on the
    /// call that empties the pool.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !(amount > 0.0) || self.is_dead() {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        self.is_dead()
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn percentage(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Opaque id of a renderer-side visual. Bodies and entities store it; they never
/// hold the visual itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_reports_the_emptying_call_once() {
        let mut health = Health::new(30.0);
        assert!(!health.take_damage(15.0));
        assert!(health.take_damage(20.0));
        assert_eq!(health.current, 0.0);
        assert!(!health.take_damage(15.0));
    }

    #[test]
    fn non_positive_damage_is_ignored() {
        let mut health = Health::new(10.0);
        assert!(!health.take_damage(0.0));
        assert!(!health.take_damage(-5.0));
        assert!(!health.take_damage(f32::NAN));
        assert_eq!(health.current, 10.0);
    }

    #[test]
    fn restore_refills() {
        let mut health = Health::new(3.0);
        health.take_damage(2.0);
        health.restore();
        assert_eq!(health.current, 3.0);
        assert_eq!(health.percentage(), 1.0);
    }
}
