//! RFC 6901 JSON Pointers and the handful of pure operations the reactive
//! runtime needs to address and mutate a `serde_json::Value` tree: parsing,
//! joining, reading, writing (with intermediate-container creation), and
//! removal.
//!
//! This crate intentionally carries no dependency beyond `serde`/
//! `serde_json`: addressing a JSON value by pointer is a self-contained
//! concern and does not need a schema, a validator, or an event model.

use serde_json::{Map, Value};
use std::fmt;

/// A single, decoded token of a JSON Pointer.
///
/// Tokens are stored decoded (`~1` -> `/`, `~0` -> `~`) and escaped only at
/// display/parse boundaries, so comparisons and map lookups never have to
/// re-decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Wraps an already-decoded token.
    #[must_use]
    pub fn new(decoded: impl Into<String>) -> Self {
        Self(decoded.into())
    }

    /// The decoded token value, e.g. `"a/b"` for the encoded token `"a~1b"`.
    #[must_use]
    pub fn decoded(&self) -> &str {
        &self.0
    }

    /// Parses this token as an array index, if it looks like one.
    ///
    /// Per RFC 6901, a valid array index is either `"0"` or a non-zero digit
    /// followed by digits; leading zeros (other than `"0"` itself) are not
    /// indices.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        if self.0 == "0" {
            return Some(0);
        }
        let mut chars = self.0.chars();
        let first = chars.next()?;
        if !('1'..='9').contains(&first) || !chars.clone().all(|c| c.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    fn encode_into(s: &str, out: &mut String) {
        for c in s.chars() {
            match c {
                '~' => out.push_str("~0"),
                '/' => out.push_str("~1"),
                other => out.push(other),
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::with_capacity(self.0.len());
        Self::encode_into(&self.0, &mut buf);
        f.write_str(&buf)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<usize> for Token {
    fn from(i: usize) -> Self {
        Self::new(i.to_string())
    }
}

/// An error encountered parsing a string as a JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPointerError {
    /// The string that failed to parse.
    pub source: String,
}

impl fmt::Display for MalformedPointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed JSON pointer {:?}: must be empty or start with '/'",
            self.source
        )
    }
}

impl std::error::Error for MalformedPointerError {}

/// An owned RFC 6901 JSON Pointer: an ordered sequence of decoded tokens.
///
/// The empty pointer (no tokens) addresses the document root. `"#"` is
/// accepted on parse and normalized to the empty pointer; it is never
/// produced on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerBuf {
    tokens: Vec<Token>,
}

impl PointerBuf {
    /// The root pointer (`""`).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses `s` as a JSON Pointer.
    ///
    /// `"#"` and `""` both parse to the root pointer. Any other string must
    /// start with `/`.
    ///
    /// # Errors
    /// Returns [`MalformedPointerError`] if `s` is non-empty, isn't `"#"`,
    /// and doesn't start with `/`.
    pub fn parse(s: &str) -> Result<Self, MalformedPointerError> {
        if s.is_empty() || s == "#" {
            return Ok(Self::root());
        }
        if !s.starts_with('/') {
            return Err(MalformedPointerError {
                source: s.to_string(),
            });
        }
        let tokens = s[1..]
            .split('/')
            .map(|raw| Token::new(raw.replace("~1", "/").replace("~0", "~")))
            .collect();
        Ok(Self { tokens })
    }

    /// The tokens of this pointer, in order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True if this pointer addresses the document root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The final token, if this pointer is non-root.
    #[must_use]
    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// Returns this pointer's parent (all but the last token), and the last
    /// token, if non-root.
    #[must_use]
    pub fn split_last(&self) -> Option<(Self, &Token)> {
        let (last, rest) = self.tokens.split_last()?;
        Some((
            Self {
                tokens: rest.to_vec(),
            },
            last,
        ))
    }

    /// Returns a new pointer with `token` appended.
    #[must_use]
    pub fn join(&self, token: impl Into<Token>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// Appends `token` in place.
    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    /// Returns a new pointer with `other`'s tokens appended after this
    /// pointer's own. Used to turn a keyword location that's relative to
    /// a parent schema into one absolute within the whole schema document.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Self { tokens }
    }
}

impl fmt::Display for PointerBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{token}")?;
        }
        Ok(())
    }
}

impl serde::Serialize for PointerBuf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// The kind of container a token expects when used to create an
/// intermediate value: numeric tokens expect arrays, everything else
/// expects objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Array,
    Object,
}

fn kind_of(token: &Token) -> Kind {
    if token.as_index().is_some() {
        Kind::Array
    } else {
        Kind::Object
    }
}

/// Reads the value at `ptr` within `instance`, if present.
#[must_use]
pub fn get<'v>(instance: &'v Value, ptr: &PointerBuf) -> Option<&'v Value> {
    let mut current = instance;
    for token in ptr.tokens() {
        current = step(current, token)?;
    }
    Some(current)
}

fn step<'v>(current: &'v Value, token: &Token) -> Option<&'v Value> {
    match current {
        Value::Object(map) => map.get(token.decoded()),
        Value::Array(arr) => arr.get(token.as_index()?),
        _ => None,
    }
}

fn step_mut<'v>(current: &'v mut Value, token: &Token) -> Option<&'v mut Value> {
    match current {
        Value::Object(map) => map.get_mut(token.decoded()),
        Value::Array(arr) => arr.get_mut(token.as_index()?),
        _ => None,
    }
}

/// Writes `value` at `ptr` within `instance`, creating intermediate
/// containers as needed.
///
/// Intermediate containers are created only when the kind they must be
/// (array for a numeric next token, object otherwise) is unambiguous; if an
/// intermediate value already exists and is of the wrong kind, `set`
/// returns `false` and leaves `instance` unchanged.
///
/// Root (`ptr.is_root()`) always succeeds, replacing `instance` entirely.
pub fn set(instance: &mut Value, ptr: &PointerBuf, value: Value) -> bool {
    let Some((last, intermediates)) = ptr.tokens().split_last() else {
        *instance = value;
        return true;
    };
    let Some(parent) = ensure_path(instance, intermediates, last) else {
        return false;
    };
    write_child(parent, last, value)
}

/// Ensures every intermediate container in `intermediates` exists within
/// `instance`, creating them per the policy documented on [`set`]. A
/// created container's kind is whatever the token indexing into it next
/// requires: the intermediate after it, or `last` for the final one.
/// Returns a mutable reference to the last intermediate container, or
/// `None` on a kind mismatch.
fn ensure_path<'v>(
    instance: &'v mut Value,
    intermediates: &[Token],
    last: &Token,
) -> Option<&'v mut Value> {
    let mut current = instance;
    for (i, token) in intermediates.iter().enumerate() {
        if step(current, token).is_none() {
            let next = intermediates.get(i + 1).unwrap_or(last);
            let placeholder = match kind_of(next) {
                Kind::Array => Value::Array(Vec::new()),
                Kind::Object => Value::Object(Map::new()),
            };
            if !write_child(current, token, placeholder) {
                return None;
            }
        }
        current = step_mut(current, token)?;
    }
    Some(current)
}

/// Writes `value` at `token` within `parent`. A numeric token against an
/// existing object, or a non-numeric token against an existing array, is
/// a kind mismatch and leaves `parent` unchanged.
fn write_child(parent: &mut Value, token: &Token, value: Value) -> bool {
    match parent {
        Value::Object(map) => {
            if token.as_index().is_some() {
                return false;
            }
            map.insert(token.decoded().to_string(), value);
            true
        }
        Value::Array(arr) => {
            let Some(index) = token.as_index() else {
                return false;
            };
            if index == arr.len() {
                arr.push(value);
            } else if index < arr.len() {
                arr[index] = value;
            } else {
                return false;
            }
            true
        }
        _ => false,
    }
}

/// Removes the value at `ptr` within `instance`.
///
/// On an array element, subsequent indices shift down (the array is
/// spliced); on an object property, the key is deleted. Returns `false` if
/// `ptr` is root or does not resolve to an existing value.
pub fn remove(instance: &mut Value, ptr: &PointerBuf) -> bool {
    let Some((parent_ptr, last)) = ptr.split_last() else {
        return false;
    };
    let Some(parent) = get_mut(instance, &parent_ptr) else {
        return false;
    };
    match parent {
        Value::Object(map) => map.remove(last.decoded()).is_some(),
        Value::Array(arr) => match last.as_index() {
            Some(index) if index < arr.len() => {
                arr.remove(index);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Mutable variant of [`get`].
pub fn get_mut<'v>(instance: &'v mut Value, ptr: &PointerBuf) -> Option<&'v mut Value> {
    let mut current = instance;
    for token in ptr.tokens() {
        current = step_mut(current, token)?;
    }
    Some(current)
}
