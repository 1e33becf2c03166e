//! Pull-parser driver for both XML generations.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::TagHandler;

/// Streams `bytes` through `handler`. Parsing stops quietly at the first
/// markup error; everything seen up to that point has already been delivered.
pub(crate) fn feed<H: TagHandler>(bytes: &[u8], handler: &mut H) {
    let mut reader = Reader::from_reader(bytes);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.expand_empty_elements = true;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                let attributes = attributes(&element);
                handler.start(&tag, &attributes);
            }
            Ok(Event::End(element)) => {
                let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                handler.end(&tag);
            }
            Ok(Event::Text(text)) => handler.data(&decode(&String::from_utf8_lossy(&text))),
            Ok(Event::CData(data)) => handler.data(&String::from_utf8_lossy(&data)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(
                    position = reader.buffer_position(),
                    error = %err,
                    "xml stream ended early"
                );
                break;
            }
        }
        buf.clear();
    }
}

fn attributes(element: &BytesStart<'_>) -> Vec<(String, String)> {
    element
        .attributes()
        .with_checks(false)
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = decode(&String::from_utf8_lossy(&attr.value));
            (key, value)
        })
        .collect()
}

/// Resolves predefined and numeric references one at a time. Entities
/// declared only in the DTD stay as written.
fn decode(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            decoded.push_str(tail);
            return decoded;
        };
        let reference = &tail[..=semi];
        match unescape(reference) {
            Ok(value) => decoded.push_str(&value),
            Err(_) => decoded.push_str(reference),
        }
        rest = &tail[semi + 1..];
    }
    decoded.push_str(rest);
    decoded
}

#[cfg(test)]
mod tests {
    use super::{decode, feed};
    use crate::extract::TagHandler;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl TagHandler for Recorder {
        fn start(&mut self, tag: &str, attributes: &[(String, String)]) {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|(name, value)| format!(" {name}={value}"))
                .collect();
            self.0.push(format!("<{tag}{}>", attrs.concat()));
        }

        fn data(&mut self, text: &str) {
            self.0.push(text.to_string());
        }

        fn end(&mut self, tag: &str) {
            self.0.push(format!("</{tag}>"));
        }
    }

    #[test]
    fn delivers_events_with_attributes_and_entities() {
        let mut recorder = Recorder::default();
        feed(
            br#"<?xml version="1.0"?><a k="v &amp; w">x &lt; y<b/></a>"#,
            &mut recorder,
        );
        assert_eq!(
            recorder.0,
            vec!["<a k=v & w>", "x < y", "<b>", "</b>", "</a>"]
        );
    }

    #[test]
    fn stops_at_malformed_markup() {
        let mut recorder = Recorder::default();
        feed(b"<a>one</a><<<", &mut recorder);
        assert_eq!(&recorder.0[..3], &["<a>", "one", "</a>"]);
    }

    #[test]
    fn unknown_entities_are_kept_verbatim() {
        let mut recorder = Recorder::default();
        feed(
            b"<p n=\"&lsquo;1&rsquo; &amp; 2\">AT&amp;T &lsquo;Crimson&rsquo; caf&#233; &lt;b&gt;</p>",
            &mut recorder,
        );
        assert_eq!(
            recorder.0,
            vec![
                "<p n=&lsquo;1&rsquo; & 2>",
                "AT&T &lsquo;Crimson&rsquo; caf\u{e9} <b>",
                "</p>",
            ]
        );
    }

    #[test]
    fn stray_ampersands_pass_through() {
        assert_eq!(decode("R&D"), "R&D");
        assert_eq!(decode("a & b; c &amp; d"), "a & b; c & d");
    }
}
