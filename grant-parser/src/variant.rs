//! Schema variants and the file-name conventions that select them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::split::SplitStrategy;

/// Member-name prefix of legacy fixed-field text files (`pftaps*.txt`).
const LEGACY_TEXT_PREFIX: &str = "pftaps";
/// Member-name prefix of first-generation XML files (`pg0*.xml`).
const XML_GEN_A_PREFIX: &str = "pg0";

/// Member extensions that carry patent documents.
pub const EXTRACTABLE_EXTENSIONS: &[&str] = &["xml", "sgml", "txt"];

/// Source document format of one archive member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    /// Fixed-field text records introduced by a `PATN` line.
    LegacyText,
    /// First XML generation (`PATDOC` root, numbered `B` tags).
    XmlGenA,
    /// Current XML generation (`us-patent-grant` root).
    XmlGenB,
}

impl SchemaVariant {
    /// All variants, oldest first.
    pub const ALL: [SchemaVariant; 3] = [Self::LegacyText, Self::XmlGenA, Self::XmlGenB];

    /// Chooses a variant from a member's file name; anything that is not a
    /// known legacy or first-generation name is read as the newest XML.
    pub fn from_member_name(name: &str) -> Self {
        let base = Path::new(name)
            .file_name()
            .and_then(|base| base.to_str())
            .unwrap_or(name);
        if base.starts_with(LEGACY_TEXT_PREFIX) {
            Self::LegacyText
        } else if base.starts_with(XML_GEN_A_PREFIX) {
            Self::XmlGenA
        } else {
            Self::XmlGenB
        }
    }

    /// How a member stream of this variant is cut into logical documents.
    pub fn split_strategy(&self) -> SplitStrategy {
        match self {
            Self::LegacyText => SplitStrategy::Legacy,
            Self::XmlGenA | Self::XmlGenB => SplitStrategy::Xml,
        }
    }

    /// Selector string accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LegacyText => "legacy-text",
            Self::XmlGenA => "xml-gen-a",
            Self::XmlGenB => "xml-gen-b",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format selector that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown schema variant '{0}' (expected legacy-text, xml-gen-a or xml-gen-b)")]
pub struct UnknownVariant(pub String);

impl FromStr for SchemaVariant {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy-text" | "aps" => Ok(Self::LegacyText),
            "xml-gen-a" | "v2.5" => Ok(Self::XmlGenA),
            "xml-gen-b" | "v4" => Ok(Self::XmlGenB),
            _ => Err(UnknownVariant(value.to_string())),
        }
    }
}

/// True when the member name ends in one of [`EXTRACTABLE_EXTENSIONS`].
pub fn is_extractable(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            EXTRACTABLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::{is_extractable, SchemaVariant, UnknownVariant};
    use crate::split::SplitStrategy;

    #[test]
    fn selects_variant_from_member_name() {
        assert_eq!(
            SchemaVariant::from_member_name("pftaps19760106_wk01.txt"),
            SchemaVariant::LegacyText
        );
        assert_eq!(
            SchemaVariant::from_member_name("2002/pg020101.xml"),
            SchemaVariant::XmlGenA
        );
        assert_eq!(
            SchemaVariant::from_member_name("ipg100105.xml"),
            SchemaVariant::XmlGenB
        );
        assert_eq!(
            SchemaVariant::from_member_name("whatever.sgml"),
            SchemaVariant::XmlGenB
        );
    }

    #[test]
    fn legacy_text_splits_on_marker_lines() {
        assert_eq!(
            SchemaVariant::LegacyText.split_strategy(),
            SplitStrategy::Legacy
        );
        assert_eq!(SchemaVariant::XmlGenA.split_strategy(), SplitStrategy::Xml);
    }

    #[test]
    fn parses_selectors() {
        for variant in SchemaVariant::ALL {
            assert_eq!(variant.as_str().parse::<SchemaVariant>(), Ok(variant));
        }
        assert_eq!(
            "sgml-1999".parse::<SchemaVariant>(),
            Err(UnknownVariant("sgml-1999".to_string()))
        );
    }

    #[test]
    fn checks_extensions() {
        assert!(is_extractable("ipg100105.xml"));
        assert!(is_extractable("pftaps19760106_wk01.TXT"));
        assert!(is_extractable("pg020101.sgml"));
        assert!(!is_extractable("ipg100105.dtd"));
        assert!(!is_extractable("README"));
    }
}
