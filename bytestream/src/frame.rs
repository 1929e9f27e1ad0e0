//! Coordinate frames.

/// A coordinate frame: the origin against which a cursor's positions are measured.
///
/// The origin is stored as an absolute buffer position, which is the sum of
/// this frame's base and the bases of every enclosing frame. The root frame has
/// origin 0 and depth 0; each [`with_offset`](crate::ByteReader::with_offset)
/// nests one level deeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Frame {
    origin: usize,
    depth: usize,
}

impl Frame {
    /// The frame of a freshly opened buffer.
    pub const ROOT: Self = Self {
        origin: 0,
        depth: 0,
    };

    /// Absolute origin of this frame.
    #[must_use]
    pub const fn origin(self) -> usize {
        self.origin
    }

    /// Nesting depth (0 for the root frame).
    #[must_use]
    pub const fn depth(self) -> usize {
        self.depth
    }

    /// Returns the frame whose position 0 maps to `base` in this frame.
    #[must_use]
    pub const fn child(self, base: usize) -> Option<Self> {
        match self.origin.checked_add(base) {
            Some(origin) => Some(Self {
                origin,
                depth: self.depth + 1,
            }),
            None => None,
        }
    }

    /// Converts a frame-relative position to an absolute one.
    #[must_use]
    pub const fn to_absolute(self, pos: usize) -> Option<usize> {
        self.origin.checked_add(pos)
    }

    /// Converts an absolute position to one relative to this frame.
    ///
    /// Positions before the origin clamp to 0.
    #[must_use]
    pub const fn to_relative(self, abs: usize) -> usize {
        abs.saturating_sub(self.origin)
    }
}
