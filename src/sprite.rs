//! Glyph-art sprites and their time-based animations.

use crate::geometry::{Point, Size};
use crate::loops::Canvas;
use ratatui::style::Color;

/// Bitmap-like glyph art. Spaces are transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    rows: Vec<String>,
    pub color: Color,
}

impl Image {
    pub fn new(rows: Vec<String>, color: Color) -> Self {
        Self { rows, color }
    }

    pub fn from_text(text: &str, color: Color) -> Self {
        let rows = text
            .lines()
            .map(str::trim_end)
            .map(String::from)
            .collect::<Vec<_>>();
        // Drop blank lines around the art but keep interior ones.
        let start = rows.iter().position(|r| !r.trim().is_empty()).unwrap_or(0);
        let end = rows
            .iter()
            .rposition(|r| !r.trim().is_empty())
            .map_or(0, |i| i + 1);
        Self::new(rows.get(start..end).map(<[String]>::to_vec).unwrap_or_default(), color)
    }

    pub fn size(&self) -> Size {
        let width = self
            .rows
            .iter()
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0);
        Size::new(width.min(u16::MAX as usize) as u16, self.rows.len().min(u16::MAX as usize) as u16)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.trim().is_empty())
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }
}

/// Which of the sprite's images is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Normal,
    Hit,
}

/// Offset applied to the art while drawing. Animations combine by adding these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transform {
    pub dx: i32,
    pub dy: i32,
}

impl std::ops::Add for Transform {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            dx: self.dx + rhs.dx,
            dy: self.dy + rhs.dy,
        }
    }
}

/// A time-driven modification of how a sprite is drawn.
pub trait Animator: Send {
    fn advance(&mut self, elapsed_ms: u64);
    fn transform(&self) -> Transform;
    /// Finished animators are dropped on the next advance.
    fn finished(&self) -> bool;
}

/// Rises the art out of the bottom of its box over a fixed duration.
#[derive(Debug, Clone)]
pub struct PopUp {
    duration_ms: u64,
    elapsed_ms: u64,
    depth: u16,
}

impl PopUp {
    pub fn new(duration_ms: u64, depth: u16) -> Self {
        Self {
            duration_ms,
            elapsed_ms: 0,
            depth,
        }
    }
}

impl Animator for PopUp {
    fn advance(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
    }

    fn transform(&self) -> Transform {
        if self.duration_ms == 0 || self.elapsed_ms >= self.duration_ms {
            return Transform::default();
        }
        let remaining = self.duration_ms - self.elapsed_ms;
        // Ceil so the art only reaches full height once the duration is over.
        let dy = (u64::from(self.depth) * remaining).div_ceil(self.duration_ms);
        Transform { dx: 0, dy: dy as i32 }
    }

    fn finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

/// Owns the images and the active animations; paints clipped to its box so risen art
/// appears to come out of a hole.
pub struct Sprite {
    normal: Image,
    hit: Image,
    variant: Variant,
    animations: Vec<(AnimationId, Box<dyn Animator>)>,
    next_animation: u64,
}

impl Sprite {
    pub fn new(normal: Image, hit: Image) -> Self {
        Self {
            normal,
            hit,
            variant: Variant::Normal,
            animations: Vec::new(),
            next_animation: 0,
        }
    }

    /// Box that contains either image.
    pub fn size(&self) -> Size {
        let (a, b) = (self.normal.size(), self.hit.size());
        Size::new(a.width.max(b.width), a.height.max(b.height))
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn set_variant(&mut self, variant: Variant) {
        self.variant = variant;
    }

    pub fn register_animation(&mut self, animator: Box<dyn Animator>) -> AnimationId {
        let id = AnimationId(self.next_animation);
        self.next_animation += 1;
        self.animations.push((id, animator));
        id
    }

    /// Returns false if the animation already finished or was never registered.
    pub fn unregister_animation(&mut self, id: AnimationId) -> bool {
        let before = self.animations.len();
        self.animations.retain(|(a, _)| *a != id);
        self.animations.len() != before
    }

    #[cfg(test)]
    pub fn active_animations(&self) -> usize {
        self.animations.len()
    }

    pub fn advance_animations(&mut self, elapsed_ms: u64) {
        for (_, a) in &mut self.animations {
            a.advance(elapsed_ms);
        }
        self.animations.retain(|(_, a)| !a.finished());
    }

    /// Sum of every active animation's transform.
    pub fn transform(&self) -> Transform {
        self.animations
            .iter()
            .map(|(_, a)| a.transform())
            .fold(Transform::default(), |acc, t| acc + t)
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, at: Point) {
        let image = match self.variant() {
            Variant::Normal => &self.normal,
            Variant::Hit => &self.hit,
        };
        let size = self.size();
        let t = self.transform();
        let (left, top) = (at.x, at.y);
        let (right, bottom) = (left + i32::from(size.width), top + i32::from(size.height));
        for (row, line) in image.rows().iter().enumerate() {
            let y = top + row as i32 + t.dy;
            if y < top || y >= bottom {
                continue;
            }
            for (col, ch) in line.chars().enumerate() {
                let x = left + col as i32 + t.dx;
                if ch == ' ' || x < left || x >= right {
                    continue;
                }
                canvas.put(x, y, ch, image.color);
            }
        }
    }
}

impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sprite")
            .field("size", &self.size())
            .field("variant", &self.variant)
            .field("animations", &self.animations.len())
            .finish()
    }
}
