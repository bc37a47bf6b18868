//! Dual-lap progress comparison.
//!
//! Two laps of different duration are compared by how much of the lap
//! distance each has covered, not by elapsed time.

use laprender_telemetry::Lap;

/// One side of a dual render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
}

/// Distance fractions of both sides at one output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressComparison {
    pub top: f64,
    pub bottom: f64,
}

impl ProgressComparison {
    /// Compare `top` at `top_secs` with `bottom` at `bottom_secs`.
    pub fn at(top: &Lap, top_secs: f64, bottom: &Lap, bottom_secs: f64) -> Self {
        Self {
            top: top.distance_fraction_at(top_secs),
            bottom: bottom.distance_fraction_at(bottom_secs),
        }
    }

    pub fn fraction(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }

    /// Side further along the lap. Ties go to the bottom.
    pub fn leader(&self) -> Side {
        if self.top > self.bottom {
            Side::Top
        } else {
            Side::Bottom
        }
    }

    /// Marker draw order: follower first, leader last so it ends up on top.
    pub fn draw_order(&self) -> [Side; 2] {
        match self.leader() {
            Side::Top => [Side::Bottom, Side::Top],
            Side::Bottom => [Side::Top, Side::Bottom],
        }
    }

    /// Top minus bottom, in percent of lap distance.
    pub fn delta_percent(&self) -> f64 {
        (self.top - self.bottom) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follower_drawn_first() {
        let c = ProgressComparison { top: 0.40, bottom: 0.65 };
        assert_eq!(c.leader(), Side::Bottom);
        assert_eq!(c.draw_order(), [Side::Top, Side::Bottom]);

        let c = ProgressComparison { top: 0.65, bottom: 0.40 };
        assert_eq!(c.leader(), Side::Top);
        assert_eq!(c.draw_order(), [Side::Bottom, Side::Top]);
    }

    #[test]
    fn test_delta_percent() {
        let c = ProgressComparison { top: 0.40, bottom: 0.65 };
        assert!((c.delta_percent() + 25.0).abs() < 1e-9);
        assert_eq!(c.fraction(Side::Top), 0.40);
    }

    #[test]
    fn test_tie_draws_top_first() {
        let c = ProgressComparison { top: 0.5, bottom: 0.5 };
        assert_eq!(c.draw_order(), [Side::Top, Side::Bottom]);
    }
}
