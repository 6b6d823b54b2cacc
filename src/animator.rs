use crate::constants::{DEFAULT_CELL_SIZE_PX, DEFAULT_SPIN_PERIOD_MS};
use crate::types::Position;

#[derive(Clone, Copy, Debug)]
pub struct AnimatorOptions {
    pub cell_size_px: f32,
    pub spin_period_ms: u64,
}

impl Default for AnimatorOptions {
    fn default() -> Self {
        Self {
            cell_size_px: DEFAULT_CELL_SIZE_PX,
            spin_period_ms: DEFAULT_SPIN_PERIOD_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug)]
struct Tween {
    from: PixelPoint,
    to: PixelPoint,
    started_at_ms: u64,
    duration_ms: u64,
}

/// Tweens the avatar between cell centers.
///
/// A new `animate_to` replaces any running tween from the avatar's current
/// interpolated position (last write wins, no queue). The paused rotation cue
/// is an independent loop and never perturbs position interpolation.
#[derive(Clone, Debug)]
pub struct PositionAnimator {
    options: AnimatorOptions,
    resting: PixelPoint,
    tween: Option<Tween>,
    spin_since_ms: Option<u64>,
}

impl PositionAnimator {
    pub fn new(options: AnimatorOptions, initial_cell: Position) -> Self {
        let mut animator = Self {
            options,
            resting: PixelPoint { x: 0.0, y: 0.0 },
            tween: None,
            spin_since_ms: None,
        };
        animator.resting = animator.cell_center(initial_cell);
        animator
    }

    pub fn cell_center(&self, cell: Position) -> PixelPoint {
        PixelPoint {
            x: (cell.x as f32 + 0.5) * self.options.cell_size_px,
            y: (cell.y as f32 + 0.5) * self.options.cell_size_px,
        }
    }

    pub fn animate_to(&mut self, cell: Position, duration_ms: u64, now_ms: u64) {
        let from = self.position_at(now_ms);
        let to = self.cell_center(cell);
        if duration_ms == 0 {
            self.resting = to;
            self.tween = None;
            return;
        }
        self.resting = from;
        self.tween = Some(Tween {
            from,
            to,
            started_at_ms: now_ms,
            duration_ms,
        });
    }

    pub fn snap_to(&mut self, cell: Position) {
        self.resting = self.cell_center(cell);
        self.tween = None;
    }

    pub fn position_at(&self, now_ms: u64) -> PixelPoint {
        let Some(tween) = self.tween else {
            return self.resting;
        };
        let elapsed_ms = now_ms.saturating_sub(tween.started_at_ms);
        if elapsed_ms >= tween.duration_ms {
            return tween.to;
        }
        let t = elapsed_ms as f32 / tween.duration_ms as f32;
        PixelPoint {
            x: tween.from.x + (tween.to.x - tween.from.x) * t,
            y: tween.from.y + (tween.to.y - tween.from.y) * t,
        }
    }

    pub fn is_animating(&self, now_ms: u64) -> bool {
        self.tween
            .map(|tween| now_ms.saturating_sub(tween.started_at_ms) < tween.duration_ms)
            .unwrap_or(false)
    }

    pub fn set_paused(&mut self, paused: bool, now_ms: u64) {
        if paused {
            if self.spin_since_ms.is_none() {
                self.spin_since_ms = Some(now_ms);
            }
        } else {
            self.spin_since_ms = None;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.spin_since_ms.is_some()
    }

    /// Angle of the looping "frozen" cue; 0 while unpaused.
    pub fn rotation_degrees_at(&self, now_ms: u64) -> f32 {
        let Some(since_ms) = self.spin_since_ms else {
            return 0.0;
        };
        if self.options.spin_period_ms == 0 {
            return 0.0;
        }
        let phase_ms = now_ms.saturating_sub(since_ms) % self.options.spin_period_ms;
        phase_ms as f32 / self.options.spin_period_ms as f32 * 360.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> PositionAnimator {
        PositionAnimator::new(AnimatorOptions::default(), Position { x: 0, y: 0 })
    }

    #[test]
    fn starts_snapped_to_the_initial_cell_center() {
        let animator = animator();
        assert_eq!(animator.position_at(0), PixelPoint { x: 20.0, y: 20.0 });
        assert!(!animator.is_animating(0));
    }

    #[test]
    fn tween_interpolates_toward_the_target_cell_center() {
        let mut animator = animator();
        animator.animate_to(Position { x: 1, y: 0 }, 400, 1_000);
        assert_eq!(animator.position_at(1_000), PixelPoint { x: 20.0, y: 20.0 });
        let midway = animator.position_at(1_200);
        assert!((midway.x - 40.0).abs() < 0.001);
        assert!((midway.y - 20.0).abs() < 0.001);
        assert_eq!(animator.position_at(1_400), PixelPoint { x: 60.0, y: 20.0 });
        assert_eq!(animator.position_at(9_999), PixelPoint { x: 60.0, y: 20.0 });
    }

    #[test]
    fn a_new_tween_overrides_the_running_one_from_the_interpolated_position() {
        let mut animator = animator();
        animator.animate_to(Position { x: 1, y: 0 }, 400, 0);
        animator.animate_to(Position { x: 1, y: 1 }, 400, 200);
        let start = animator.position_at(200);
        assert!((start.x - 40.0).abs() < 0.001);
        assert!((start.y - 20.0).abs() < 0.001);
        assert_eq!(animator.position_at(600), PixelPoint { x: 60.0, y: 60.0 });
    }

    #[test]
    fn zero_duration_snaps_immediately() {
        let mut animator = animator();
        animator.animate_to(Position { x: 2, y: 2 }, 0, 500);
        assert_eq!(animator.position_at(500), PixelPoint { x: 100.0, y: 100.0 });
        assert!(!animator.is_animating(500));
    }

    #[test]
    fn paused_rotation_loops_without_touching_position() {
        let mut animator = animator();
        animator.animate_to(Position { x: 1, y: 0 }, 400, 0);
        animator.set_paused(true, 100);
        assert!(animator.is_paused());
        assert!(animator.rotation_degrees_at(400) > 0.0);
        assert_eq!(animator.rotation_degrees_at(100), 0.0);
        assert_eq!(
            animator.rotation_degrees_at(100 + 1_200),
            animator.rotation_degrees_at(100)
        );
        // position interpolation is unaffected by the cue
        assert_eq!(animator.position_at(400), PixelPoint { x: 60.0, y: 20.0 });
        animator.set_paused(false, 500);
        assert_eq!(animator.rotation_degrees_at(600), 0.0);
    }

    #[test]
    fn set_paused_is_idempotent_and_keeps_the_loop_phase() {
        let mut animator = animator();
        animator.set_paused(true, 100);
        let phase = animator.rotation_degrees_at(700);
        animator.set_paused(true, 500);
        assert_eq!(animator.rotation_degrees_at(700), phase);
    }
}
