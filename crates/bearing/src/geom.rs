use serde::{Deserialize, Serialize};

pub const FULL_TURN: f64 = 360.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self` in compass degrees (0 = up, clockwise).
    pub fn polar(&self, radius: f64, degrees: f64) -> Self {
        let theta = to_screen_radians(degrees);
        Self::new(self.x + radius * theta.cos(), self.y + radius * theta.sin())
    }

    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Wraps any finite angle into `[0, 360)`.
pub fn normalize(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Signed shortest rotation from `from` to `to`, in `[-180, 180)`.
pub fn shortest_diff(from: f64, to: f64) -> f64 {
    (normalize(to) - normalize(from) + 540.0).rem_euclid(FULL_TURN) - 180.0
}

/// Compass degrees (0 = up, clockwise) to the screen angle used by `cos`/`sin`
/// on a y-down surface.
pub fn to_screen_radians(degrees: f64) -> f64 {
    (degrees - 90.0).to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_stays_in_range() {
        let cases = [
            (0.0, 0.0),
            (360.0, 0.0),
            (720.0, 0.0),
            (-360.0, 0.0),
            (-90.0, 270.0),
            (450.5, 90.5),
            (-1e-15, 0.0),
            (359.999, 359.999),
        ];
        for (input, expected) in cases {
            let got = normalize(input);
            assert!((0.0..FULL_TURN).contains(&got), "{input} -> {got}");
            assert!((got - expected).abs() < 1e-9, "{input} -> {got}");
        }

        let mut x = -1000.0;
        while x < 1000.0 {
            let got = normalize(x);
            assert!((0.0..FULL_TURN).contains(&got), "{x} -> {got}");
            x += 7.3;
        }
    }

    #[test]
    fn test_shortest_diff_crosses_north() {
        assert!((shortest_diff(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((shortest_diff(10.0, 350.0) + 20.0).abs() < 1e-9);
        assert!((shortest_diff(90.0, 90.0)).abs() < 1e-9);
        assert!((shortest_diff(0.0, 179.0) - 179.0).abs() < 1e-9);
        assert!((shortest_diff(-30.0, 30.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_polar_zero_points_up() {
        let c = Point::new(100.0, 100.0);
        let up = c.polar(50.0, 0.0);
        assert!((up.x - 100.0).abs() < 1e-9);
        assert!((up.y - 50.0).abs() < 1e-9);

        let east = c.polar(50.0, 90.0);
        assert!((east.x - 150.0).abs() < 1e-9);
        assert!((east.y - 100.0).abs() < 1e-9);
        assert!((c.distance(east) - 50.0).abs() < 1e-9);
    }
}
