//! Relevance predicate over classification codes and document type.

use crate::record::{DocumentType, PatentRecord};

/// Leading characters of classification codes worth keeping.
pub const RELEVANT_PREFIXES: &[char] = &['H', 'G', 'Y'];

/// Which classification lists carried at least one relevant code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationMatch {
    pub international: bool,
    pub cooperative: bool,
}

impl ClassificationMatch {
    /// Checks both classification lists of `record`.
    pub fn of(record: &PatentRecord) -> Self {
        Self {
            international: any_relevant(&record.international_classifications),
            cooperative: any_relevant(&record.cooperative_classifications),
        }
    }

    /// True when either list matched.
    pub fn any(&self) -> bool {
        self.international || self.cooperative
    }
}

/// A record is relevant when it is a utility grant with at least one code
/// starting with one of [`RELEVANT_PREFIXES`].
pub fn is_relevant(record: &PatentRecord) -> bool {
    record.document_type == DocumentType::Utility && ClassificationMatch::of(record).any()
}

fn any_relevant(codes: &[String]) -> bool {
    codes.iter().any(|code| has_relevant_prefix(code))
}

fn has_relevant_prefix(code: &str) -> bool {
    code.chars()
        .next()
        .is_some_and(|first| RELEVANT_PREFIXES.contains(&first))
}
