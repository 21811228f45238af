// Structured-data export: the architecture tree as JSON

use crate::analysis::Architecture;
use crate::config::JsonOptions;
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::io::{self, Write};

const INDENT: &[u8] = b"    ";

/// Lossless serialization of the whole architecture
pub fn render(architecture: &Architecture, options: &JsonOptions) -> Result<String> {
    to_string(architecture, options)
}

/// Serialize any value with the configured layout and escaping
pub fn to_string<T: Serialize + ?Sized>(value: &T, options: &JsonOptions) -> Result<String> {
    let mut out = Vec::new();
    if options.pretty {
        let formatter = EscapingFormatter::new(PrettyFormatter::with_indent(INDENT), options);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut ser)?;
    } else {
        let formatter = EscapingFormatter::new(CompactFormatter, options);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut ser)?;
    }
    if options.pretty {
        out.push(b'\n');
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Wraps a layout formatter, adding `\/` and `\uXXXX` escapes on request
struct EscapingFormatter<F> {
    inner: F,
    escape_slashes: bool,
    escape_unicode: bool,
}

impl<F: Formatter> EscapingFormatter<F> {
    fn new(inner: F, options: &JsonOptions) -> Self {
        Self {
            inner,
            escape_slashes: options.escape_slashes,
            escape_unicode: options.escape_unicode,
        }
    }
}

impl<F: Formatter> Formatter for EscapingFormatter<F> {
    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if !self.escape_slashes && !self.escape_unicode {
            return writer.write_all(fragment.as_bytes());
        }

        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escape_slash = self.escape_slashes && ch == '/';
            let escape_char = self.escape_unicode && !ch.is_ascii();
            if !escape_slash && !escape_char {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            if escape_slash {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ArchitectureMetadata, Component, ComponentKind, Metadata, RouteMeta, ScanResult};

    fn architecture() -> Architecture {
        let mut route = Component::degraded(ComponentKind::Route, "GET api/café", "routes/api.php".to_string(), "");
        route.note = None;
        route.metadata = Metadata::Route(RouteMeta {
            uri: "api/café".to_string(),
            methods: vec!["GET".to_string()],
            closure: true,
            ..Default::default()
        });
        Architecture::new(
            ArchitectureMetadata::new("Shop", "/srv/shop"),
            vec![
                ScanResult::new(ComponentKind::Route, vec![route]),
                ScanResult::empty(ComponentKind::Model),
            ],
        )
    }

    #[test]
    fn test_pretty_round_trip() {
        let options = JsonOptions::default();
        let first = render(&architecture(), &options).unwrap();
        let parsed: Architecture = serde_json::from_str(&first).unwrap();
        let second = render(&parsed, &options).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\n    \"metadata\""));
    }

    #[test]
    fn test_compact_round_trip() {
        let options = JsonOptions {
            pretty: false,
            ..Default::default()
        };
        let first = render(&architecture(), &options).unwrap();
        assert!(!first.contains('\n'));
        let parsed: Architecture = serde_json::from_str(&first).unwrap();
        assert_eq!(render(&parsed, &options).unwrap(), first);
    }

    #[test]
    fn test_escape_flags() {
        let options = JsonOptions {
            pretty: false,
            escape_slashes: true,
            escape_unicode: true,
        };
        let out = to_string("api/café", &options).unwrap();
        assert_eq!(out, r#""api\/caf\u00e9""#);
        assert_eq!(serde_json::from_str::<String>(&out).unwrap(), "api/café");

        let plain = to_string("api/café", &JsonOptions { pretty: false, ..Default::default() }).unwrap();
        assert_eq!(plain, "\"api/café\"");
    }

    #[test]
    fn test_escape_astral_as_surrogates() {
        let options = JsonOptions {
            pretty: false,
            escape_slashes: false,
            escape_unicode: true,
        };
        assert_eq!(to_string("🚀", &options).unwrap(), r#""\ud83d\ude80""#);
    }

    #[test]
    fn test_escaped_round_trip() {
        let options = JsonOptions {
            pretty: true,
            escape_slashes: true,
            escape_unicode: true,
        };
        let first = render(&architecture(), &options).unwrap();
        let parsed: Architecture = serde_json::from_str(&first).unwrap();
        assert_eq!(render(&parsed, &options).unwrap(), first);
    }
}
