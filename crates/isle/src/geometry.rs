use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A size the client has to honour. Zero in either dimension means
    /// "client decides".
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn with_top_left(&self, origin: Point) -> Rectangle {
        Rectangle::from_parts(origin, self.size())
    }

    pub fn with_size(&self, size: Size) -> Rectangle {
        Rectangle::from_parts(self.top_left(), size)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        if !self.intersects(other) {
            return None;
        }
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        Some(Rectangle::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let r = Rectangle::new(10, 10, 100, 50);
        assert!(r.contains(Point::new(10, 10)));
        assert!(r.contains(Point::new(109, 59)));
        assert!(!r.contains(Point::new(110, 30)));
        assert!(!r.contains(Point::new(50, 60)));
    }

    #[test]
    fn test_intersection() {
        let a = Rectangle::new(0, 0, 1920, 1080);
        let b = Rectangle::new(1800, 1000, 400, 400);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(1800, 1000, 120, 80)));

        let c = Rectangle::new(1920, 0, 1280, 1024);
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_point_arithmetic() {
        let pointer = Point::new(300, 240);
        let origin = Point::new(100, 40);
        assert_eq!(pointer - origin, Point::new(200, 200));
        assert_eq!(origin + Point::new(200, 200), pointer);
    }

    #[test]
    fn test_size_validity() {
        assert!(Size::new(1, 1).is_valid());
        assert!(!Size::new(0, 600).is_valid());
        assert!(!Size::default().is_valid());
    }
}
