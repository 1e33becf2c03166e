//! Parse bulk patent grant files into normalized records.
//!
//! This crate covers the three formats the grant archives have used over
//! time: fixed-field text records, the first XML generation and the current
//! XML generation. A member stream is cut into logical documents
//! ([`split`]), each document is reduced to a [`PatentRecord`] ([`extract`]),
//! and [`filter`] decides which records are kept.

pub mod extract;
pub mod filter;
pub mod record;
pub mod split;
pub mod variant;

use std::io::BufRead;

pub use extract::{extract_document, Extractor, TagHandler};
pub use filter::{is_relevant, ClassificationMatch};
pub use record::{DocumentType, PatentRecord};
pub use split::{DocumentSplitter, LogicalDocument, SplitError, SplitStrategy};
pub use variant::{is_extractable, SchemaVariant, UnknownVariant};

/// Splits `reader` with the variant's strategy and extracts every document.
///
/// Records are produced lazily. A read failure is yielded once and ends the
/// sequence.
pub fn extract_records<R: BufRead>(
    reader: R,
    variant: SchemaVariant,
) -> impl Iterator<Item = Result<PatentRecord, SplitError>> {
    DocumentSplitter::new(reader, variant.split_strategy())
        .map(move |document| document.map(|document| extract_document(variant, &document)))
}
