//! Save option flags.
//!
//! `SaveOptions` is a `u32` bitmask. The bit values are the engine's
//! historical `XML_SAVE_*` constants so that masks coming from a host can
//! be passed through unchanged. Which bits are actually available depends
//! on the engine version; see [`capability`](super::capability).

use std::ops::{BitOr, BitOrAssign};

/// A set of serialization options.
///
/// # Examples
///
/// ```
/// use xmlsave::serial::SaveOptions;
///
/// let opts = SaveOptions::FORMAT | SaveOptions::NO_DECLARATION;
/// assert!(opts.contains(SaveOptions::FORMAT));
/// assert_eq!(opts.bits(), 3);
/// assert_eq!(opts.without(SaveOptions::FORMAT), SaveOptions::NO_DECLARATION);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SaveOptions(u32);

impl SaveOptions {
    /// No options: compact output with an XML declaration.
    pub const NONE: Self = Self(0);
    /// Indent element-only content.
    pub const FORMAT: Self = Self(1);
    /// Drop the XML declaration.
    pub const NO_DECLARATION: Self = Self(1 << 1);
    /// Write childless elements as `<a></a>` instead of `<a/>`.
    pub const NO_EMPTY_TAGS: Self = Self(1 << 2);
    /// Never apply XHTML1 rules, even for an XHTML DOCTYPE.
    pub const NO_XHTML: Self = Self(1 << 3);
    /// Always apply XHTML1 rules.
    pub const REQUIRE_XHTML: Self = Self(1 << 4);
    /// Write HTML documents as XML.
    pub const AS_XML: Self = Self(1 << 5);
    /// Write any document with HTML rules.
    pub const AS_HTML: Self = Self(1 << 6);
    /// Format with whitespace placed inside tags.
    pub const FORMAT_WHITESPACE: Self = Self(1 << 7);

    /// Wraps a raw bitmask without checking it against any capability table.
    #[must_use]
    pub const fn from_bits_retain(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `self` with the bits of `other` set.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns the bits of `self` that are not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        self.without(other)
    }
}

impl BitOr for SaveOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl BitOrAssign for SaveOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.with(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_values_match_engine_constants() {
        let bits: Vec<u32> = [
            SaveOptions::FORMAT,
            SaveOptions::NO_DECLARATION,
            SaveOptions::NO_EMPTY_TAGS,
            SaveOptions::NO_XHTML,
            SaveOptions::REQUIRE_XHTML,
            SaveOptions::AS_XML,
            SaveOptions::AS_HTML,
            SaveOptions::FORMAT_WHITESPACE,
        ]
        .iter()
        .map(|o| o.bits())
        .collect();
        assert_eq!(bits, [1, 2, 4, 8, 16, 32, 64, 128]);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(SaveOptions::default().is_empty());
        assert_eq!(SaveOptions::default(), SaveOptions::NONE);
    }

    #[test]
    fn test_or_assign_and_difference() {
        let mut opts = SaveOptions::FORMAT;
        opts |= SaveOptions::AS_HTML;
        assert!(opts.contains(SaveOptions::FORMAT | SaveOptions::AS_HTML));
        assert_eq!(opts.difference(SaveOptions::FORMAT), SaveOptions::AS_HTML);
        assert!(!opts.contains(SaveOptions::AS_XML));
    }
}
