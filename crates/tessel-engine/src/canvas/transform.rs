use crate::coords::Mat4;

/// Nested transforms. Each push composes onto the current matrix (`parent * child`).
#[derive(Debug)]
pub struct TransformStack {
    saved: Vec<Mat4>,
    current: Mat4,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self {
            saved: Vec::new(),
            current: Mat4::IDENTITY,
        }
    }
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composes `transform` onto the current matrix and returns the result.
    pub fn push(&mut self, transform: Mat4) -> Mat4 {
        self.saved.push(self.current);
        if !transform.is_identity() {
            self.current = self.current * transform;
        }
        self.current
    }

    /// Restores the previous matrix. `None` when nothing was pushed.
    pub fn pop(&mut self) -> Option<Mat4> {
        let previous = self.saved.pop()?;
        self.current = previous;
        Some(previous)
    }

    #[inline]
    pub fn current(&self) -> Mat4 {
        self.current
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.current.is_identity()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
