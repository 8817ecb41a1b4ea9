//! Capability registry.
//!
//! Lists the save options the formatting engine provides. A baseline of
//! three options is always present; the XHTML/HTML tier and the
//! non-significant-whitespace tier only exist from the engine versions that
//! introduced them. The table is built once per process from
//! [`ENGINE_VERSION`] and never changes afterwards, so call sites consult the
//! table instead of checking versions themselves.

use std::sync::OnceLock;

use crate::error::OpenError;

use super::SaveOptions;

/// Version of the formatting engine in this crate, in the engine's
/// `MAJOR * 10000 + MINOR * 100 + PATCH` numbering.
pub const ENGINE_VERSION: u32 = 20914;

/// First engine version with the XHTML/HTML/XML mode options.
pub const HTML_TIER_VERSION: u32 = 20704;

/// First engine version with `format_whitespace`.
pub const WSNONSIG_TIER_VERSION: u32 = 20708;

/// A group of options that appeared together in one engine version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Always available.
    Baseline,
    /// XHTML rules and forced XML/HTML output.
    Html,
    /// Formatting with non-significant whitespace.
    WhitespaceFormatting,
}

impl Tier {
    /// The lowest engine version that provides this tier.
    #[must_use]
    pub const fn min_version(self) -> u32 {
        match self {
            Self::Baseline => 0,
            Self::Html => HTML_TIER_VERSION,
            Self::WhitespaceFormatting => WSNONSIG_TIER_VERSION,
        }
    }
}

/// One entry of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionInfo {
    /// Option name as hosts spell it (e.g., `"no_declaration"`).
    pub name: &'static str,
    /// The flag this name stands for.
    pub bit: SaveOptions,
    /// Human-readable description for help text.
    pub description: &'static str,
    /// The tier the option belongs to.
    pub tier: Tier,
}

const OPTION_TABLE: [OptionInfo; 8] = [
    OptionInfo {
        name: "format",
        bit: SaveOptions::FORMAT,
        description: "Format output",
        tier: Tier::Baseline,
    },
    OptionInfo {
        name: "no_declaration",
        bit: SaveOptions::NO_DECLARATION,
        description: "Drop the XML declaration",
        tier: Tier::Baseline,
    },
    OptionInfo {
        name: "no_empty_tags",
        bit: SaveOptions::NO_EMPTY_TAGS,
        description: "Remove empty tags",
        tier: Tier::Baseline,
    },
    OptionInfo {
        name: "no_xhtml",
        bit: SaveOptions::NO_XHTML,
        description: "Disable XHTML1 rules",
        tier: Tier::Html,
    },
    OptionInfo {
        name: "require_xhtml",
        bit: SaveOptions::REQUIRE_XHTML,
        description: "Force XHTML1 rules",
        tier: Tier::Html,
    },
    OptionInfo {
        name: "as_xml",
        bit: SaveOptions::AS_XML,
        description: "Force XML output",
        tier: Tier::Html,
    },
    OptionInfo {
        name: "as_html",
        bit: SaveOptions::AS_HTML,
        description: "Force HTML output",
        tier: Tier::Html,
    },
    OptionInfo {
        name: "format_whitespace",
        bit: SaveOptions::FORMAT_WHITESPACE,
        description: "Format with non-significant whitespace",
        tier: Tier::WhitespaceFormatting,
    },
];

/// Pairs of options that are rejected when requested together.
const CONFLICTS: [(SaveOptions, SaveOptions); 2] = [
    (SaveOptions::AS_XML, SaveOptions::AS_HTML),
    (SaveOptions::NO_XHTML, SaveOptions::REQUIRE_XHTML),
];

/// The options available for one engine version, in fixed order.
#[derive(Debug, Clone)]
pub struct Capabilities {
    version: u32,
    options: Vec<OptionInfo>,
    mask: SaveOptions,
}

impl Capabilities {
    /// Builds the table for an engine of the given version.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlsave::serial::capability::Capabilities;
    ///
    /// assert_eq!(Capabilities::for_version(20703).len(), 3);
    /// assert_eq!(Capabilities::for_version(20704).len(), 7);
    /// assert_eq!(Capabilities::for_version(20708).len(), 8);
    /// ```
    #[must_use]
    pub fn for_version(version: u32) -> Self {
        let options: Vec<OptionInfo> = OPTION_TABLE
            .iter()
            .filter(|info| version >= info.tier.min_version())
            .copied()
            .collect();
        let mask = options
            .iter()
            .fold(SaveOptions::NONE, |acc, info| acc | info.bit);
        Self {
            version,
            options,
            mask,
        }
    }

    /// The engine version this table was built for.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Iterates the available options: baseline first, then each tier.
    pub fn iter(&self) -> std::slice::Iter<'_, OptionInfo> {
        self.options.iter()
    }

    /// Number of available options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always `false`: the baseline tier is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Looks up an available option by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&OptionInfo> {
        self.options.iter().find(|info| info.name == name)
    }

    /// The union of all available bits.
    #[must_use]
    pub fn mask(&self) -> SaveOptions {
        self.mask
    }

    /// Returns `true` if every bit of `options` is available.
    #[must_use]
    pub fn supports(&self, options: SaveOptions) -> bool {
        self.mask.contains(options)
    }

    /// Checks a bitmask against this table.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::UnsupportedOptions`] with the offending bits when
    /// `options` has bits this engine does not provide, and
    /// [`OpenError::ConflictingOptions`] when mutually exclusive options are
    /// combined.
    pub fn validate(&self, options: SaveOptions) -> Result<SaveOptions, OpenError> {
        let unsupported = options.difference(self.mask);
        if !unsupported.is_empty() {
            return Err(OpenError::UnsupportedOptions(unsupported.bits()));
        }
        for (a, b) in CONFLICTS {
            if options.contains(a | b) {
                return Err(OpenError::ConflictingOptions(name_of(a), name_of(b)));
            }
        }
        Ok(options)
    }

    /// Converts option names into a validated bitmask.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::UnknownOption`] for a name that is not available
    /// in this table, or any error from [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlsave::serial::{available_options, SaveOptions};
    ///
    /// let opts = available_options().parse_names(["format", "no_declaration"]).unwrap();
    /// assert_eq!(opts, SaveOptions::FORMAT | SaveOptions::NO_DECLARATION);
    /// ```
    pub fn parse_names<I, S>(&self, names: I) -> Result<SaveOptions, OpenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = SaveOptions::NONE;
        for name in names {
            let name = name.as_ref();
            let info = self
                .lookup(name)
                .ok_or_else(|| OpenError::UnknownOption(name.to_string()))?;
            options |= info.bit;
        }
        self.validate(options)
    }
}

impl<'a> IntoIterator for &'a Capabilities {
    type Item = &'a OptionInfo;
    type IntoIter = std::slice::Iter<'a, OptionInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn name_of(bit: SaveOptions) -> &'static str {
    OPTION_TABLE
        .iter()
        .find(|info| info.bit == bit)
        .map_or("?", |info| info.name)
}

/// Returns the capability table of this engine, built on first use.
#[must_use]
pub fn available_options() -> &'static Capabilities {
    static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();
    CAPABILITIES.get_or_init(|| Capabilities::for_version(ENGINE_VERSION))
}
