//! Geometric primitives for dashboard layout.

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate the distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A rectangle defined by position and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: f32,
    /// Y coordinate of the top-left corner.
    pub y: f32,
    /// Width of the rectangle.
    pub width: f32,
    /// Height of the rectangle.
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// X coordinate of the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Y coordinate of the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if a point is inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.x..=self.right()).contains(&point.x) && (self.y..=self.bottom()).contains(&point.y)
    }

    /// Shrinks the rectangle by `amount` on every side, never below zero size.
    #[must_use]
    pub fn inset(&self, amount: f32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }

    /// Splits off a strip of `height` from the top, returning `(top, rest)`.
    #[must_use]
    pub fn split_top(&self, height: f32) -> (Self, Self) {
        let height = height.clamp(0.0, self.height);
        (
            Self::new(self.x, self.y, self.width, height),
            Self::new(self.x, self.y + height, self.width, self.height - height),
        )
    }

    /// Divides the rectangle into `count` equal rows separated by `gap`.
    #[must_use]
    pub fn rows(&self, count: usize, gap: f32) -> Vec<Self> {
        if count == 0 {
            return Vec::new();
        }
        let gaps = gap * (count - 1) as f32;
        let row_height = ((self.height - gaps) / count as f32).max(0.0);
        (0..count)
            .map(|i| {
                let y = self.y + i as f32 * (row_height + gap);
                Self::new(self.x, y, self.width, row_height)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert_relative_eq!(p1.distance(p2), 5.0);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(5.0, 5.0)));
        assert!(!rect.contains(Point::new(15.0, 5.0)));
    }

    #[test]
    fn test_inset_never_negative() {
        let rect = Rect::new(0.0, 0.0, 10.0, 4.0).inset(3.0);
        assert_relative_eq!(rect.x, 3.0);
        assert_relative_eq!(rect.width, 4.0);
        assert_relative_eq!(rect.height, 0.0);
    }

    #[test]
    fn test_split_top() {
        let (top, rest) = Rect::new(0.0, 10.0, 100.0, 100.0).split_top(30.0);
        assert_relative_eq!(top.height, 30.0);
        assert_relative_eq!(rest.y, 40.0);
        assert_relative_eq!(rest.height, 70.0);
    }

    #[test]
    fn test_rows_cover_height() {
        let rows = Rect::new(0.0, 0.0, 100.0, 430.0).rows(4, 10.0);
        assert_eq!(rows.len(), 4);
        assert_relative_eq!(rows[0].height, 100.0);
        assert_relative_eq!(rows[3].y, 330.0);
        assert_relative_eq!(rows[3].bottom(), 430.0);
    }

    #[test]
    fn test_rows_zero() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).rows(0, 1.0).is_empty());
    }
}
