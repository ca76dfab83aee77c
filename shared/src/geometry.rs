//! Plane geometry used by route validation, deletion hit-tests and bus motion.

/// A point (or vector) in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Value along the x-axis.
    pub x: f32,
    /// Value along the y-axis.
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the squared magnitude of the vector.
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Returns the difference of two vectors.
    pub fn sub(&self, other: &Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Returns the sum of two vectors.
    pub fn add(&self, other: &Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Point {
        Point {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f32 {
    b.sub(&a).magnitude()
}

/// Linear interpolation from `a` to `b`; `t = 0` yields `a`, `t = 1` yields `b`.
pub fn lerp(a: Point, b: Point, t: f32) -> Point {
    a.add(&b.sub(&a).scale(t))
}

/// Shortest distance from `p` to the closed segment `a`-`b`.
///
/// A degenerate segment (`a == b`) collapses to the point distance.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let ab = b.sub(&a);
    let l2 = ab.magnitude_squared();
    if l2 == 0.0 {
        return distance(p, a);
    }

    let t = (p.sub(&a).dot(&ab) / l2).clamp(0.0, 1.0);
    let projection = a.add(&ab.scale(t));
    distance(p, projection)
}

/// Total length of a polyline.
pub fn polyline_length(nodes: &[Point]) -> f32 {
    nodes.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}
