//! Line driver for the fixed-field text format.
//!
//! Lines are `CODE  value`: a three-character field code, padding, and the
//! value. Bare section lines (`PATN`, `ABST`, ...) open a section that lasts
//! until the next one; lines indented by four spaces continue the previous
//! field.

use super::{TagHandler, LEGACY_SECTIONS};

const CONTINUATION_INDENT: &str = "    ";

pub(crate) fn feed<H: TagHandler>(text: &str, handler: &mut H) {
    let mut section: Option<&'static str> = None;

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        if !line.contains(' ') {
            if let Some(known) = LEGACY_SECTIONS.iter().copied().find(|name| *name == line) {
                if let Some(open) = section.take() {
                    handler.end(open);
                }
                handler.start(known, &[]);
                section = Some(known);
            }
            continue;
        }

        if line.starts_with(CONTINUATION_INDENT) {
            handler.data(field_value(line));
            continue;
        }

        let Some(code) = line.split_whitespace().next() else {
            continue;
        };
        handler.start(code, &[]);
        handler.data(field_value(line));
        handler.end(code);
    }

    if let Some(open) = section {
        handler.end(open);
    }
}

/// Value part of a field line. Codes are normally three characters wide;
/// when the fourth character is not padding the value starts after the
/// first character instead.
fn field_value(line: &str) -> &str {
    let tail = line.get(3..).unwrap_or("");
    let value = if tail.starts_with(' ') {
        tail
    } else {
        line.get(1..).unwrap_or("")
    };
    value.trim_start()
}
