//! Pointer-velocity driven stroke width for freehand drawing.

use crate::geometry::Vector;

/// Pointer speed (units/s) that maps to a speed factor of 1.0.
const VELOCITY_ADJUSTMENT: f64 = 600.0;

/// Below this combined speed factor the pointer is considered stopped.
const MIN_SPEED_FACTOR: f64 = 1e-9;

/// Width of the next freehand segment.
///
/// Fast strokes get thinner, slow strokes approach `width`. The result
/// never moves more than 25% away from `previous_width` in one sample, and
/// always stays within `[0.2 * width, width]`; when those ranges do not
/// overlap the second clamp wins. A stopped pointer (zero speed) yields the
/// nominal `width` before clamping instead of dividing by zero.
pub fn modulated_width(
    width: f64,
    velocity: Vector,
    previous_velocity: Vector,
    previous_width: f64,
) -> f64 {
    let speed = velocity.length() / VELOCITY_ADJUSTMENT;
    let previous_speed = previous_velocity.length() / VELOCITY_ADJUSTMENT;

    let denominator = 0.6 * speed + 0.4 * previous_speed;
    let modulated = if denominator > MIN_SPEED_FACTOR {
        width / denominator
    } else {
        width
    };

    let limited = clamp(modulated, 0.75 * previous_width, 1.25 * previous_width);
    clamp(limited, 0.2 * width, width)
}

/// Lower bound is checked first, so an inverted range resolves to `min`.
fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_slow_pointer_keeps_nominal_width() {
        let w = modulated_width(
            10.0,
            Point::new(60.0, 0.0),
            Point::new(60.0, 0.0),
            10.0,
        );
        assert!((w - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fast_pointer_thins_gradually() {
        // speed factor 2.0 -> 10 / 2 = 5, limited to 0.75 * 10
        let w = modulated_width(
            10.0,
            Point::new(1200.0, 0.0),
            Point::new(1200.0, 0.0),
            10.0,
        );
        assert!((w - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_velocity_does_not_divide_by_zero() {
        let w = modulated_width(10.0, Point::ZERO, Point::ZERO, 8.0);
        assert!(w.is_finite());
        assert!((w - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_floor_wins_when_previous_width_tiny() {
        let w = modulated_width(10.0, Point::new(6000.0, 0.0), Point::ZERO, 0.5);
        assert!((w - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_hold_over_sample_grid() {
        let widths = [0.5, 1.0, 4.0, 20.0, 75.0];
        let speeds = [0.0, 1.0, 50.0, 300.0, 600.0, 1800.0, 10_000.0];
        for &width in &widths {
            for &previous_width in &widths {
                for &vx in &speeds {
                    for &pvy in &speeds {
                        let velocity = Point::new(vx, vx / 3.0);
                        let previous = Point::new(0.0, pvy);
                        let w = modulated_width(width, velocity, previous, previous_width);

                        assert!(w >= 0.2 * width - 1e-12, "{w} below floor for {width}");
                        assert!(w <= width + 1e-12, "{w} above nominal {width}");

                        let lo = (0.2 * width).max(0.75 * previous_width);
                        let hi = width.min(1.25 * previous_width);
                        if lo <= hi {
                            assert!(w >= lo - 1e-12 && w <= hi + 1e-12);
                        }
                    }
                }
            }
        }
    }
}
