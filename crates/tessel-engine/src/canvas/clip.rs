use crate::coords::{Rect, Vec2};

/// Region pushed onto the clip stack.
///
/// Rectangles clip exactly. Other shapes clip to their axis-aligned bounding box.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipShape {
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f32 },
    Circle { center: Vec2, radius: f32 },
    Path(Vec<Vec2>),
}

impl ClipShape {
    pub fn bounds(&self) -> Rect {
        match self {
            ClipShape::Rect(rect) | ClipShape::RoundedRect { rect, .. } => rect.normalized(),
            ClipShape::Circle { center, radius } => {
                let r = radius.abs();
                Rect::new(center.x - r, center.y - r, r * 2.0, r * 2.0)
            }
            ClipShape::Path(points) => Rect::bounding(points).unwrap_or_default(),
        }
    }
}

/// One stack level: the shape as pushed plus its effective bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEntry {
    pub shape: ClipShape,
    /// Shape bounds intersected with every parent. Zero-area when nothing is visible.
    pub bounds: Rect,
}

/// Nested clip regions.
///
/// The top entry is always the current effective clip, already intersected
/// with all parents, so child bounds never exceed their parent's.
#[derive(Debug, Default)]
pub struct ClipStack {
    entries: Vec<ClipEntry>,
}

impl ClipStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `shape` and returns its effective bounds.
    ///
    /// An empty intersection collapses to a zero-area rectangle at the parent's
    /// origin: everything drawn under it is hidden.
    pub fn push(&mut self, shape: ClipShape) -> Rect {
        let own = shape.bounds();
        let bounds = match self.entries.last() {
            None => own,
            Some(parent) => parent
                .bounds
                .intersect(own)
                .unwrap_or(Rect::from_origin_size(parent.bounds.origin, Vec2::zero())),
        };
        self.entries.push(ClipEntry { shape, bounds });
        bounds
    }

    /// Pops the top entry. `None` when the stack was already empty.
    pub fn pop(&mut self) -> Option<ClipEntry> {
        self.entries.pop()
    }

    /// Current effective clip; `None` when unclipped.
    #[inline]
    pub fn current(&self) -> Option<Rect> {
        self.entries.last().map(|e| e.bounds)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_bounds() {
        assert_eq!(
            ClipShape::Circle { center: Vec2::new(10.0, 10.0), radius: 5.0 }.bounds(),
            Rect::new(5.0, 5.0, 10.0, 10.0)
        );
        let tri = vec![Vec2::new(0.0, 4.0), Vec2::new(3.0, -1.0), Vec2::new(6.0, 2.0)];
        assert_eq!(ClipShape::Path(tri).bounds(), Rect::new(0.0, -1.0, 6.0, 5.0));
        assert!(ClipShape::Path(Vec::new()).bounds().is_empty());
    }

    #[test]
    fn nested_clips_intersect() {
        let mut stack = ClipStack::new();
        stack.push(ClipShape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let inner = stack.push(ClipShape::Rect(Rect::new(50.0, 50.0, 100.0, 100.0)));
        assert_eq!(inner, Rect::new(50.0, 50.0, 50.0, 50.0));
        assert_eq!(stack.current(), Some(inner));
    }

    #[test]
    fn disjoint_clip_collapses_to_zero_area() {
        let mut stack = ClipStack::new();
        stack.push(ClipShape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let child = stack.push(ClipShape::Rect(Rect::new(200.0, 200.0, 10.0, 10.0)));
        assert!(child.is_empty());
        assert!(Rect::new(0.0, 0.0, 100.0, 100.0).contains_rect(child));

        // Anything under an empty clip stays empty.
        let grandchild = stack.push(ClipShape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(grandchild.is_empty());
    }

    #[test]
    fn pop_restores_parent() {
        let mut stack = ClipStack::new();
        let outer = stack.push(ClipShape::RoundedRect { rect: Rect::new(0.0, 0.0, 10.0, 10.0), radius: 2.0 });
        stack.push(ClipShape::Rect(Rect::new(2.0, 2.0, 2.0, 2.0)));
        assert!(stack.pop().is_some());
        assert_eq!(stack.current(), Some(outer));
        assert!(stack.pop().is_some());
        assert_eq!(stack.current(), None);
        assert!(stack.pop().is_none());
    }
}
