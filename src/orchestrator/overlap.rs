//! Shrinks the keyboard pair until the halves no longer overlap.

use egui::Vec2;

pub const SHRINK_STEP: f32 = 0.98;
pub const SCALE_FLOOR: f32 = 0.3;
pub const MAX_ITERATIONS: usize = 100;

/// One keyboard half as overlap avoidance sees it.
#[derive(Clone, Copy, Debug)]
pub struct PairedSurface<F> {
    /// Left edge for the left half; right edge for the right half.
    pub anchor_x: f32,
    pub user_scale: f32,
    /// Extent at a given scale.
    pub extent: F,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapResult {
    pub left_scale: f32,
    pub right_scale: f32,
    pub iterations: usize,
    pub overlapping: bool,
}

fn shrink(scale: f32) -> f32 {
    if scale > SCALE_FLOOR {
        (scale * SHRINK_STEP).max(SCALE_FLOOR)
    } else {
        scale
    }
}

/// Left edge of the right half at `width`, kept on screen.
pub fn right_left_edge(anchor_right: f32, width: f32, screen_width: f32) -> f32 {
    anchor_right.min(screen_width) - width
}

/// Shrink both scales 2% per step until the left half's right edge no longer
/// passes the right half's (screen-clamped) left edge, both reach the floor,
/// or the iteration bound is hit. Scales never grow.
pub fn avoid_overlap<L, R>(
    left: PairedSurface<L>,
    right: PairedSurface<R>,
    screen_width: f32,
) -> OverlapResult
where
    L: Fn(f32) -> Vec2,
    R: Fn(f32) -> Vec2,
{
    let mut left_scale = left.user_scale;
    let mut right_scale = right.user_scale;
    let overlaps = |ls: f32, rs: f32| {
        let left_right = left.anchor_x + (left.extent)(ls).x;
        let right_left = right_left_edge(right.anchor_x, (right.extent)(rs).x, screen_width);
        left_right > right_left
    };

    let mut iterations = 0;
    while iterations < MAX_ITERATIONS && overlaps(left_scale, right_scale) {
        let (next_left, next_right) = (shrink(left_scale), shrink(right_scale));
        if next_left == left_scale && next_right == right_scale {
            break;
        }
        left_scale = next_left;
        right_scale = next_right;
        iterations += 1;
    }

    let overlapping = overlaps(left_scale, right_scale);
    if iterations > 0 {
        tracing::debug!(left_scale, right_scale, iterations, overlapping, "keyboards rescaled to avoid overlap");
    }
    OverlapResult {
        left_scale,
        right_scale,
        iterations,
        overlapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(width: f32) -> impl Fn(f32) -> Vec2 {
        move |s| Vec2::new(width * s, 100.0 * s)
    }

    #[test]
    fn no_overlap_keeps_user_scales() {
        let result = avoid_overlap(
            PairedSurface { anchor_x: 0.0, user_scale: 1.0, extent: plain(400.0) },
            PairedSurface { anchor_x: 1000.0, user_scale: 1.2, extent: plain(400.0) },
            1000.0,
        );
        assert_eq!(result.left_scale, 1.0);
        assert_eq!(result.right_scale, 1.2);
        assert_eq!(result.iterations, 0);
        assert!(!result.overlapping);
    }

    #[test]
    fn overlapping_pair_shrinks_until_clear() {
        // 2 x 600 on an 1000 px screen: needs both at <= 0.8333.
        let result = avoid_overlap(
            PairedSurface { anchor_x: 0.0, user_scale: 1.0, extent: plain(600.0) },
            PairedSurface { anchor_x: 1000.0, user_scale: 1.0, extent: plain(600.0) },
            1000.0,
        );
        assert!(!result.overlapping);
        assert!(result.left_scale <= 1.0 / 1.2);
        assert!(result.left_scale > 1.0 / 1.2 * SHRINK_STEP - 1e-4);
        assert_eq!(result.left_scale, result.right_scale);
    }

    #[test]
    fn impossible_fit_stops_at_the_floor() {
        let result = avoid_overlap(
            PairedSurface { anchor_x: 0.0, user_scale: 1.0, extent: plain(5000.0) },
            PairedSurface { anchor_x: 1000.0, user_scale: 1.0, extent: plain(5000.0) },
            1000.0,
        );
        assert!(result.overlapping);
        assert_eq!(result.left_scale, SCALE_FLOOR);
        assert_eq!(result.right_scale, SCALE_FLOOR);
        assert!(result.iterations <= MAX_ITERATIONS);
    }

    #[test]
    fn scales_below_the_floor_are_never_raised() {
        let result = avoid_overlap(
            PairedSurface { anchor_x: 0.0, user_scale: 0.2, extent: plain(5000.0) },
            PairedSurface { anchor_x: 1000.0, user_scale: 1.0, extent: plain(5000.0) },
            1000.0,
        );
        assert_eq!(result.left_scale, 0.2);
        assert_eq!(result.right_scale, SCALE_FLOOR);
    }

    #[test]
    fn right_anchor_is_clamped_to_the_screen() {
        // Right half anchored past the screen edge counts from the edge.
        assert_eq!(right_left_edge(1200.0, 300.0, 1000.0), 700.0);
        assert_eq!(right_left_edge(900.0, 300.0, 1000.0), 600.0);
    }
}
