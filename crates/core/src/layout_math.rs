//! Deterministic helpers behind the trail geometry.
//!
//! Nothing here is random in the statistical sense: every function returns the
//! same output for the same input on every platform, which is what keeps trail
//! layouts reproducible between renders and in tests.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a hash of the UTF-8 bytes of `text`.
///
/// ```
/// # use quest_core::layout_math::hash_seed;
/// assert_eq!(hash_seed(""), 0x811c_9dc5);
/// assert_eq!(hash_seed("a"), 0xe40c_292c);
/// ```
#[must_use]
pub fn hash_seed(text: &str) -> u32 {
    text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Cosmetic jitter in `[0, 1)` keyed by node and unit position.
///
/// Not uniform and not suitable for anything but layout wobble.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seeded_unit(node_index: usize, unit_index: usize, salt: f64) -> f64 {
    let raw = ((node_index as f64) * 12.9898 + (unit_index as f64) * 78.233 + salt).sin()
        * 43_758.545_3;
    let fract = raw - raw.floor();
    // A tiny negative `raw` can round up to exactly 1.0.
    if fract.is_finite() && fract < 1.0 {
        fract
    } else {
        0.0
    }
}

//
// ─── PATHS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One drawing instruction of a trail path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo(Point),
    CubicTo { c1: Point, c2: Point, to: Point },
}

/// Converts an ordered point list into a smooth cubic Bezier path passing
/// through every point (uniform Catmull-Rom, tension 1/6).
///
/// End segments reuse the first/last point as their missing neighbour.
#[must_use]
pub fn catmull_rom_to_bezier(points: &[Point]) -> Vec<PathCommand> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut commands = Vec::with_capacity(points.len());
    commands.push(PathCommand::MoveTo(*first));

    let last = points.len() - 1;
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        let c1 = Point::new(p1.x + (p2.x - p0.x) / 6.0, p1.y + (p2.y - p0.y) / 6.0);
        let c2 = Point::new(p2.x - (p3.x - p1.x) / 6.0, p2.y - (p3.y - p1.y) / 6.0);
        commands.push(PathCommand::CubicTo { c1, c2, to: p2 });
    }

    commands
}

/// Renders commands as SVG path data with two decimals (`M x y C ...`).
#[must_use]
pub fn path_data(commands: &[PathCommand]) -> String {
    let mut out = String::new();
    for command in commands {
        if !out.is_empty() {
            out.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = match command {
            PathCommand::MoveTo(p) => write!(out, "M {:.2} {:.2}", p.x, p.y),
            PathCommand::CubicTo { c1, c2, to } => write!(
                out,
                "C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
                c1.x, c1.y, c2.x, c2.y, to.x, to.y
            ),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_seed_matches_fnv1a_vectors() {
        assert_eq!(hash_seed(""), 0x811c_9dc5);
        assert_eq!(hash_seed("a"), 0xe40c_292c);
        assert_eq!(hash_seed("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn hash_seed_modulo_is_stable() {
        let first = hash_seed("abc|success") % 3;
        for _ in 0..16 {
            assert_eq!(hash_seed("abc|success") % 3, first);
        }
    }

    #[test]
    fn seeded_unit_is_deterministic_and_in_range() {
        for unit in 0..4 {
            for node in 0..64 {
                let a = seeded_unit(node, unit, 1.618);
                let b = seeded_unit(node, unit, 1.618);
                assert_eq!(a.to_bits(), b.to_bits());
                assert!((0.0..1.0).contains(&a), "{a} out of range");
            }
        }
    }

    #[test]
    fn seeded_unit_varies_with_salt() {
        assert_ne!(seeded_unit(3, 1, 0.0), seeded_unit(3, 1, 4.2));
    }

    #[test]
    fn bezier_handles_degenerate_inputs() {
        assert!(catmull_rom_to_bezier(&[]).is_empty());

        let single = catmull_rom_to_bezier(&[Point::new(50.0, 10.0)]);
        assert_eq!(single, vec![PathCommand::MoveTo(Point::new(50.0, 10.0))]);
        assert_eq!(path_data(&single), "M 50.00 10.00");
    }

    #[test]
    fn bezier_control_points_clamp_at_ends() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(6.0, 6.0),
            Point::new(12.0, 0.0),
        ];
        let commands = catmull_rom_to_bezier(&points);
        assert_eq!(commands.len(), 3);

        // First segment: p0 == p1, so c1 = p1 + (p2 - p1) / 6.
        let PathCommand::CubicTo { c1, c2, to } = commands[1] else {
            panic!("expected cubic segment");
        };
        assert_eq!(c1, Point::new(1.0, 1.0));
        // c2 = p2 - (p3 - p1) / 6 with p3 = points[2].
        assert_eq!(c2, Point::new(4.0, 6.0));
        assert_eq!(to, points[1]);

        // Last segment: p3 == p2.
        let PathCommand::CubicTo { c2, to, .. } = commands[2] else {
            panic!("expected cubic segment");
        };
        assert_eq!(c2, Point::new(11.0, 1.0));
        assert_eq!(to, points[2]);
    }

    #[test]
    fn bezier_output_is_reproducible() {
        let points: Vec<Point> = (0..8)
            .map(|i| Point::new(f64::from(i) * 3.5, f64::from(i * i)))
            .collect();
        assert_eq!(
            path_data(&catmull_rom_to_bezier(&points)),
            path_data(&catmull_rom_to_bezier(&points))
        );
    }
}
