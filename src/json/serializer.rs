//! Streaming JSON emitter.

use std::fmt::{self, Write as _};
use std::marker::PhantomData;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::blob::{Unchecked, Validation};

use super::consumer::JsonConsumer;
use super::errors::{JsonError, JsonResult};

/// Output formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonConfig {
    /// Newlines and indentation between members.
    pub pretty: bool,
    /// Spaces per nesting level when pretty printing.
    pub indent: usize,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 4,
        }
    }
}

impl JsonConfig {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Array,
    Object,
}

impl ScopeKind {
    fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Array => "array",
            ScopeKind::Object => "object",
        }
    }
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    members: usize,
    key_pending: bool,
}

/// Writes one JSON document to a consumer, fragment by fragment.
///
/// Under `Validated` every call checks the document structure: scopes
/// close in order, keys appear only in objects and each takes exactly one
/// value, and there is a single top-level value. Under `Unchecked` the
/// same misuse produces malformed text and no error.
pub struct JsonSerializer<'c, C: JsonConsumer + ?Sized, V: Validation = Unchecked> {
    consumer: &'c mut C,
    config: JsonConfig,
    scopes: Vec<Scope>,
    root_written: bool,
    _mode: PhantomData<V>,
}

impl<'c, C: JsonConsumer + ?Sized, V: Validation> JsonSerializer<'c, C, V> {
    pub fn new(consumer: &'c mut C) -> Self {
        Self::with_config(consumer, JsonConfig::default())
    }

    pub fn with_config(consumer: &'c mut C, config: JsonConfig) -> Self {
        Self {
            consumer,
            config,
            scopes: Vec::new(),
            root_written: false,
            _mode: PhantomData,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Writes an object key. The next call must write its value.
    pub fn write_key(&mut self, key: &[u8]) -> JsonResult<()> {
        let members = match self.scopes.last() {
            Some(scope) if scope.kind == ScopeKind::Object => {
                if V::ENABLED && scope.key_pending {
                    return Err(JsonError::KeyWithoutValue);
                }
                scope.members
            }
            _ if V::ENABLED => return Err(JsonError::KeyOutsideObject),
            Some(scope) => scope.members,
            None => 0,
        };

        if members > 0 {
            self.emit(b",");
        }
        self.newline(self.scopes.len());
        self.emit_quoted(key);
        let colon: &[u8] = if self.config.pretty { b": " } else { b":" };
        self.emit(colon);

        if let Some(scope) = self.scopes.last_mut() {
            scope.key_pending = true;
        }
        Ok(())
    }

    pub fn write_null(&mut self) -> JsonResult<()> {
        self.begin_value()?;
        self.emit(b"null");
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> JsonResult<()> {
        self.begin_value()?;
        let text: &[u8] = if value { b"true" } else { b"false" };
        self.emit(text);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> JsonResult<()> {
        self.write_number(format_args!("{}", value))
    }

    pub fn write_u32(&mut self, value: u32) -> JsonResult<()> {
        self.write_number(format_args!("{}", value))
    }

    /// 64-bit integers are written as plain numbers; readers parsing into
    /// doubles lose precision past 2^53.
    pub fn write_i64(&mut self, value: i64) -> JsonResult<()> {
        self.write_number(format_args!("{}", value))
    }

    pub fn write_u64(&mut self, value: u64) -> JsonResult<()> {
        self.write_number(format_args!("{}", value))
    }

    /// Written at f32 precision. NaN and infinities become `null`.
    pub fn write_f32(&mut self, value: f32) -> JsonResult<()> {
        if !value.is_finite() {
            return self.write_null();
        }
        self.write_number(format_args!("{:?}", value))
    }

    /// NaN and infinities become `null`.
    pub fn write_f64(&mut self, value: f64) -> JsonResult<()> {
        if !value.is_finite() {
            return self.write_null();
        }
        self.write_number(format_args!("{:?}", value))
    }

    /// Writes a string value. Invalid UTF-8 sequences become U+FFFD.
    pub fn write_str(&mut self, value: &[u8]) -> JsonResult<()> {
        self.begin_value()?;
        self.emit_quoted(value);
        Ok(())
    }

    /// Writes bytes as a standard base64 string.
    pub fn write_base64(&mut self, bytes: &[u8]) -> JsonResult<()> {
        const CHUNK: usize = 3 * 256;

        self.begin_value()?;
        self.emit(b"\"");
        let mut encoded = [0u8; CHUNK / 3 * 4];
        for chunk in bytes.chunks(CHUNK) {
            match STANDARD.encode_slice(chunk, &mut encoded) {
                Ok(n) => self.consumer.consume(&encoded[..n]),
                Err(_) => self.consumer.consume(STANDARD.encode(chunk).as_bytes()),
            }
        }
        self.emit(b"\"");
        Ok(())
    }

    pub fn open_array(&mut self) -> JsonResult<()> {
        self.open(ScopeKind::Array, b"[")
    }

    pub fn close_array(&mut self) -> JsonResult<()> {
        self.close(ScopeKind::Array, b"]")
    }

    pub fn open_object(&mut self) -> JsonResult<()> {
        self.open(ScopeKind::Object, b"{")
    }

    pub fn close_object(&mut self) -> JsonResult<()> {
        self.close(ScopeKind::Object, b"}")
    }

    /// Ends the document and terminates the consumer.
    pub fn finish(&mut self) -> JsonResult<()> {
        if V::ENABLED {
            if !self.scopes.is_empty() {
                return Err(JsonError::UnclosedScope {
                    open: self.scopes.len(),
                });
            }
            if !self.root_written {
                return Err(JsonError::Empty);
            }
        }
        if self.config.pretty {
            self.emit(b"\n");
        }
        self.consumer.terminate();
        Ok(())
    }

    fn open(&mut self, kind: ScopeKind, bracket: &[u8]) -> JsonResult<()> {
        self.begin_value()?;
        self.emit(bracket);
        self.scopes.push(Scope {
            kind,
            members: 0,
            key_pending: false,
        });
        Ok(())
    }

    fn close(&mut self, kind: ScopeKind, bracket: &[u8]) -> JsonResult<()> {
        if V::ENABLED {
            match self.scopes.last() {
                Some(scope) if scope.kind == kind && !scope.key_pending => {}
                Some(scope) if scope.kind == kind => return Err(JsonError::KeyWithoutValue),
                Some(scope) => {
                    return Err(JsonError::MismatchedClose {
                        expected: scope.kind.as_str(),
                        found: kind.as_str(),
                    })
                }
                None => {
                    return Err(JsonError::MismatchedClose {
                        expected: "none",
                        found: kind.as_str(),
                    })
                }
            }
        }

        let members = self.scopes.pop().map_or(0, |scope| scope.members);
        if members > 0 {
            self.newline(self.scopes.len());
        }
        self.emit(bracket);
        Ok(())
    }

    /// Separators and bookkeeping shared by every value.
    fn begin_value(&mut self) -> JsonResult<()> {
        let depth = self.scopes.len();
        let pretty = self.config.pretty;

        let Some(scope) = self.scopes.last_mut() else {
            if V::ENABLED && self.root_written {
                return Err(JsonError::MultipleRoots);
            }
            self.root_written = true;
            return Ok(());
        };

        if scope.kind == ScopeKind::Object && scope.key_pending {
            scope.key_pending = false;
            scope.members += 1;
            return Ok(());
        }
        if V::ENABLED && scope.kind == ScopeKind::Object {
            return Err(JsonError::MissingKey);
        }

        let first = scope.members == 0;
        scope.members += 1;
        if !first {
            self.emit(b",");
        }
        if pretty {
            self.newline(depth);
        }
        Ok(())
    }

    fn write_number(&mut self, args: fmt::Arguments<'_>) -> JsonResult<()> {
        self.begin_value()?;
        let mut digits = NumberBuffer::default();
        match digits.write_fmt(args) {
            Ok(()) => self.emit(digits.as_bytes()),
            Err(_) => self.emit(args.to_string().as_bytes()),
        }
        Ok(())
    }

    fn newline(&mut self, depth: usize) {
        if !self.config.pretty {
            return;
        }
        self.emit(b"\n");
        const SPACES: &[u8] = b"                                ";
        let mut pad = depth * self.config.indent;
        while pad > 0 {
            let n = pad.min(SPACES.len());
            self.emit(&SPACES[..n]);
            pad -= n;
        }
    }

    fn emit(&mut self, text: &[u8]) {
        self.consumer.consume(text);
    }

    fn emit_quoted(&mut self, value: &[u8]) {
        self.emit(b"\"");
        let mut rest = value;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.emit_escaped(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // valid_up_to marks a UTF-8 boundary
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        self.emit_escaped(valid);
                    }
                    self.emit("\u{FFFD}".as_bytes());
                    match err.error_len() {
                        Some(bad) => rest = &after[bad..],
                        None => break,
                    }
                }
            }
        }
        self.emit(b"\"");
    }

    fn emit_escaped(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let escaped: &[u8] = match b {
                b'"' => b"\\\"",
                b'\\' => b"\\\\",
                0x08 => b"\\b",
                0x0c => b"\\f",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                0x00..=0x1f => {
                    self.emit(&bytes[start..i]);
                    let hex = b"0123456789abcdef";
                    let unicode = [
                        b'\\',
                        b'u',
                        b'0',
                        b'0',
                        hex[usize::from(b >> 4)],
                        hex[usize::from(b & 0xf)],
                    ];
                    self.emit(&unicode);
                    start = i + 1;
                    continue;
                }
                _ => continue,
            };
            self.emit(&bytes[start..i]);
            self.emit(escaped);
            start = i + 1;
        }
        self.emit(&bytes[start..]);
    }
}

/// Stack buffer for number formatting.
struct NumberBuffer {
    bytes: [u8; 40],
    len: usize,
}

impl Default for NumberBuffer {
    fn default() -> Self {
        Self {
            bytes: [0; 40],
            len: 0,
        }
    }
}

impl NumberBuffer {
    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Write for NumberBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Scalars the emitter can write directly.
pub trait WriteJson: Copy {
    fn write_json<C: JsonConsumer + ?Sized, V: Validation>(
        self,
        serializer: &mut JsonSerializer<'_, C, V>,
    ) -> JsonResult<()>;
}

macro_rules! impl_write_json {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl WriteJson for $ty {
                fn write_json<C: JsonConsumer + ?Sized, V: Validation>(
                    self,
                    serializer: &mut JsonSerializer<'_, C, V>,
                ) -> JsonResult<()> {
                    serializer.$method(self)
                }
            }
        )*
    };
}

impl_write_json! {
    bool => write_bool,
    i32 => write_i32,
    u32 => write_u32,
    i64 => write_i64,
    u64 => write_u64,
    f32 => write_f32,
    f64 => write_f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Validated;

    fn compact<F>(build: F) -> JsonResult<String>
    where
        F: FnOnce(&mut JsonSerializer<'_, String, Validated>) -> JsonResult<()>,
    {
        let mut out = String::new();
        let mut serializer = JsonSerializer::new(&mut out);
        build(&mut serializer)?;
        serializer.finish()?;
        Ok(out)
    }

    // ==================== Output Tests ====================

    #[test]
    fn test_compact_document() {
        let out = compact(|s| {
            s.open_object()?;
            s.write_key(b"id")?;
            s.write_i32(7)?;
            s.write_key(b"tags")?;
            s.open_array()?;
            s.write_str(b"a")?;
            s.write_str(b"b")?;
            s.close_array()?;
            s.write_key(b"score")?;
            s.write_f64(1.5)?;
            s.close_object()
        })
        .unwrap();
        assert_eq!(out, r#"{"id":7,"tags":["a","b"],"score":1.5}"#);
    }

    #[test]
    fn test_pretty_document() {
        let mut out = String::new();
        let mut s: JsonSerializer<'_, String, Validated> =
            JsonSerializer::with_config(&mut out, JsonConfig { pretty: true, indent: 2 });
        s.open_object().unwrap();
        s.write_key(b"a").unwrap();
        s.open_array().unwrap();
        s.write_u32(1).unwrap();
        s.write_u32(2).unwrap();
        s.close_array().unwrap();
        s.write_key(b"b").unwrap();
        s.open_array().unwrap();
        s.close_array().unwrap();
        s.close_object().unwrap();
        s.finish().unwrap();
        assert_eq!(out, "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": []\n}\n");
    }

    #[test]
    fn test_escaping() {
        let out = compact(|s| s.write_str(b"q\"b\\\n\t\x01\x7f")).unwrap();
        assert!(out.starts_with(r#""q\"b\\\n\t\u0001"#));
        let parsed: String = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, "q\"b\\\n\t\u{1}\u{7f}");
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let out = compact(|s| s.write_str(b"ok\xffok")).unwrap();
        let parsed: String = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, "ok\u{FFFD}ok");
    }

    #[test]
    fn test_keys_escaped() {
        let out = compact(|s| {
            s.open_object()?;
            s.write_key(b"a\"b")?;
            s.write_null()?;
            s.close_object()
        })
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(parsed["a\"b"].is_null());
    }

    #[test]
    fn test_non_finite_floats_are_null() {
        let out = compact(|s| {
            s.open_array()?;
            s.write_f64(f64::NAN)?;
            s.write_f32(f32::INFINITY)?;
            s.write_f64(1e300)?;
            s.close_array()
        })
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(parsed[0].is_null());
        assert!(parsed[1].is_null());
        assert_eq!(parsed[2], 1e300);
    }

    #[test]
    fn test_f32_precision() {
        let out = compact(|s| s.write_f32(0.1)).unwrap();
        assert_eq!(out, "0.1");
    }

    #[test]
    fn test_extreme_integers() {
        let out = compact(|s| {
            s.open_array()?;
            s.write_i64(i64::MIN)?;
            s.write_u64(u64::MAX)?;
            s.close_array()
        })
        .unwrap();
        assert_eq!(out, "[-9223372036854775808,18446744073709551615]");
    }

    #[test]
    fn test_base64() {
        let long: Vec<u8> = (0..2000u32).map(|i| i as u8).collect();
        let out = compact(|s| s.write_base64(&long)).unwrap();
        let parsed: String = serde_json::from_str(&out).unwrap();
        assert_eq!(STANDARD.decode(parsed).unwrap(), long);

        let short = compact(|s| s.write_base64(b"hi")).unwrap();
        assert_eq!(short, "\"aGk=\"");
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_key_outside_object() {
        let err = compact(|s| {
            s.open_array()?;
            s.write_key(b"k")
        })
        .unwrap_err();
        assert_eq!(err, JsonError::KeyOutsideObject);
    }

    #[test]
    fn test_value_without_key() {
        let err = compact(|s| {
            s.open_object()?;
            s.write_bool(true)
        })
        .unwrap_err();
        assert_eq!(err, JsonError::MissingKey);
    }

    #[test]
    fn test_two_keys_in_a_row() {
        let err = compact(|s| {
            s.open_object()?;
            s.write_key(b"a")?;
            s.write_key(b"b")
        })
        .unwrap_err();
        assert_eq!(err, JsonError::KeyWithoutValue);
    }

    #[test]
    fn test_mismatched_close() {
        let err = compact(|s| {
            s.open_array()?;
            s.close_object()
        })
        .unwrap_err();
        assert!(matches!(err, JsonError::MismatchedClose { expected: "array", .. }));
    }

    #[test]
    fn test_unclosed_scope() {
        let err = compact(|s| s.open_object()).unwrap_err();
        assert_eq!(err, JsonError::UnclosedScope { open: 1 });
    }

    #[test]
    fn test_multiple_roots() {
        let err = compact(|s| {
            s.write_null()?;
            s.write_null()
        })
        .unwrap_err();
        assert_eq!(err, JsonError::MultipleRoots);
    }

    #[test]
    fn test_unchecked_misuse_does_not_fail() {
        let mut out = String::new();
        let mut s: JsonSerializer<'_, String> = JsonSerializer::new(&mut out);
        s.open_array().unwrap();
        s.write_key(b"k").unwrap();
        s.close_object().unwrap();
        s.finish().unwrap();
        assert_eq!(out, "[\"k\":}");
    }

    #[test]
    fn test_generic_scalar_writer() {
        let out = compact(|s| {
            s.open_array()?;
            true.write_json(s)?;
            (-3i32).write_json(s)?;
            2.5f64.write_json(s)?;
            s.close_array()
        })
        .unwrap();
        assert_eq!(out, "[true,-3,2.5]");
    }
}
