//! Cuts one archive member's byte stream into logical documents.
//!
//! Bulk files concatenate many documents without a container element. The
//! legacy text format starts every record with a `PATN` line; the XML formats
//! repeat the XML declaration in front of every document. Both strategies
//! read line by line and yield lazily, so a member is never held in memory
//! as a whole.

use std::borrow::Cow;
use std::io::{self, BufRead};

use thiserror::Error;

/// Record-start marker line of the legacy text format.
const LEGACY_MARKER: &[u8] = b"PATN";

/// Declaration forms that open a new XML document, checked in this order.
const XML_DECLARATIONS: &[&[u8]] = &[
    b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
    b"<?xml version=\"1.0\"?>",
];

/// Boundary detection used for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Documents start at a `PATN` marker line.
    Legacy,
    /// Documents start at a repeated XML declaration.
    Xml,
}

/// One source document carved out of a member stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDocument {
    index: usize,
    bytes: Vec<u8>,
}

impl LogicalDocument {
    /// Wraps raw bytes as the `index`-th document of a stream.
    pub fn new(index: usize, bytes: Vec<u8>) -> Self {
        Self { index, bytes }
    }

    /// Position of the document within its member, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Text view of the document; invalid UTF-8 is replaced, not rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Errors surfaced while reading a member stream.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The underlying reader failed; the rest of the member is abandoned.
    #[error("member stream read failed after {documents} document(s)")]
    Read {
        documents: usize,
        #[source]
        source: io::Error,
    },
}

/// Lazy, single-pass sequence of logical documents over a buffered reader.
///
/// The final buffered span is always yielded at end of stream, even when it
/// is empty. After a read error the iterator yields that error once and then
/// ends.
pub struct DocumentSplitter<R> {
    reader: R,
    strategy: SplitStrategy,
    buffer: Vec<u8>,
    started: bool,
    finished: bool,
    next_index: usize,
}

impl<R: BufRead> DocumentSplitter<R> {
    /// Creates a splitter that reads `reader` with the given strategy.
    pub fn new(reader: R, strategy: SplitStrategy) -> Self {
        Self {
            reader,
            strategy,
            buffer: Vec::new(),
            started: false,
            finished: false,
            next_index: 0,
        }
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize, SplitError> {
        line.clear();
        self.reader
            .read_until(b'\n', line)
            .map_err(|source| SplitError::Read {
                documents: self.next_index,
                source,
            })
    }

    fn take_document(&mut self, next: Vec<u8>) -> LogicalDocument {
        let bytes = std::mem::replace(&mut self.buffer, next);
        let document = LogicalDocument::new(self.next_index, bytes);
        self.next_index += 1;
        document
    }

    fn finish(&mut self) -> LogicalDocument {
        self.finished = true;
        self.take_document(Vec::new())
    }

    // The first line is a file header and is consumed; the second line seeds
    // the first document without being checked for the marker.
    fn start_legacy(&mut self) -> Result<(), SplitError> {
        let mut line = Vec::new();
        self.read_line(&mut line)?;
        self.read_line(&mut line)?;
        self.buffer.extend_from_slice(&line);
        Ok(())
    }

    // The first line is the opening declaration of the first document.
    fn start_xml(&mut self) -> Result<(), SplitError> {
        let mut line = Vec::new();
        self.read_line(&mut line)?;
        self.buffer.extend_from_slice(&line);
        Ok(())
    }

    fn next_document(&mut self) -> Result<LogicalDocument, SplitError> {
        if !self.started {
            self.started = true;
            match self.strategy {
                SplitStrategy::Legacy => self.start_legacy()?,
                SplitStrategy::Xml => self.start_xml()?,
            }
        }

        let mut line = Vec::new();
        loop {
            if self.read_line(&mut line)? == 0 {
                return Ok(self.finish());
            }
            match self.strategy {
                SplitStrategy::Legacy => {
                    if is_legacy_marker(&line) {
                        return Ok(self.take_document(std::mem::take(&mut line)));
                    }
                }
                SplitStrategy::Xml => {
                    if let Some(declaration) = find_declaration(&line) {
                        let remainder = strip_all(&line, declaration);
                        self.buffer.extend_from_slice(&remainder);
                        return Ok(self.take_document(declaration.to_vec()));
                    }
                }
            }
            self.buffer.extend_from_slice(&line);
        }
    }
}

impl<R: BufRead> Iterator for DocumentSplitter<R> {
    type Item = Result<LogicalDocument, SplitError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_document();
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Convenience helper for in-memory member content.
pub fn split_documents(bytes: &[u8], strategy: SplitStrategy) -> DocumentSplitter<&[u8]> {
    DocumentSplitter::new(bytes, strategy)
}

fn is_legacy_marker(line: &[u8]) -> bool {
    line.trim_ascii() == LEGACY_MARKER
}

fn find_declaration(line: &[u8]) -> Option<&'static [u8]> {
    XML_DECLARATIONS
        .iter()
        .copied()
        .find(|declaration| find_subslice(line, declaration).is_some())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn strip_all(line: &[u8], needle: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = find_subslice(rest, needle) {
        out.extend_from_slice(&rest[..pos]);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}
