//! Board geometry: points, boxes, random placement and board occupancy.

use crate::sync::lock;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Board coordinate in terminal cells. Signed so boxes can hang off the edge (hit margins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box; `x..x+width` by `y..y+height`, right/bottom edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn at(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: i32::from(size.width),
            height: i32::from(size.height),
        }
    }

    /// 1x1 box around `p`, grown by `margin` on every side.
    pub fn around(p: Point, margin: u16) -> Self {
        let m = i32::from(margin);
        Self {
            x: p.x - m,
            y: p.y - m,
            width: 1 + 2 * m,
            height: 1 + 2 * m,
        }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// True if the two boxes share at least one cell.
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True if `other` lies entirely inside `self`.
    #[cfg(test)]
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Identity of an actor slot; stable for the whole level.
pub type ActorId = usize;

/// The playable area. Owns no actors: it only hands out placements and remembers which
/// actor ids are currently shown on it.
#[derive(Debug)]
pub struct Board {
    pub width: u16,
    pub height: u16,
    occupants: Mutex<BTreeSet<ActorId>>,
}

impl Board {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            occupants: Mutex::new(BTreeSet::new()),
        }
    }

    #[cfg(test)]
    pub fn bounds(&self) -> Bounds {
        Bounds::at(Point::default(), Size::new(self.width, self.height))
    }

    /// A point where a box of `size` fits entirely on the board.
    /// Axes on which the box is larger than the board collapse to 0.
    pub fn random_point(&self, size: Size, rng: &mut impl Rng) -> Point {
        let max_x = self.width.saturating_sub(size.width);
        let max_y = self.height.saturating_sub(size.height);
        Point::new(
            i32::from(rng.gen_range(0..=max_x)),
            i32::from(rng.gen_range(0..=max_y)),
        )
    }

    pub fn register(&self, id: ActorId) {
        lock(&self.occupants).insert(id);
    }

    pub fn deregister(&self, id: ActorId) {
        lock(&self.occupants).remove(&id);
    }

    /// Number of actors currently shown.
    pub fn occupied(&self) -> usize {
        lock(&self.occupants).len()
    }
}
