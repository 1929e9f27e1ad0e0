//! Session configuration.

use wire::Limits;

/// How a write session stores an empty string reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyString {
    /// Empty strings are interned like any other value (a lone terminator).
    #[default]
    Pooled,
    /// Empty strings are written as a zero offset and never enter the pool.
    NullOffset,
}

/// Configuration shared by read and write sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Decode limits.
    pub limits: Limits,
    /// Fail a write session that ends with unresolved patch sites. When off,
    /// such sites keep their zero placeholder and a warning is logged.
    pub strict_patches: bool,
    /// Convention for empty pooled strings.
    pub empty_strings: EmptyString,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            strict_patches: cfg!(debug_assertions),
            empty_strings: EmptyString::Pooled,
        }
    }
}

impl CodecConfig {
    /// Creates a configuration suitable for testing: small limits, strict patching.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            limits: Limits::for_testing(),
            strict_patches: true,
            empty_strings: EmptyString::Pooled,
        }
    }

    /// Creates a configuration with no limits (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            limits: Limits::unlimited(),
            strict_patches: cfg!(debug_assertions),
            empty_strings: EmptyString::Pooled,
        }
    }

    /// Sets the empty-string convention.
    #[must_use]
    pub const fn with_empty_strings(mut self, empty_strings: EmptyString) -> Self {
        self.empty_strings = empty_strings;
        self
    }

    /// Sets whether unresolved patch sites fail the session.
    #[must_use]
    pub const fn with_strict_patches(mut self, strict: bool) -> Self {
        self.strict_patches = strict;
        self
    }
}
