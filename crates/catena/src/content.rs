//! Content values threaded between loader phases.
//!
//! Every phase invocation receives and returns a positional argument list
//! of `Content` values. Position 0 carries the resource content being
//! transformed; later positions carry whatever auxiliary data the loaders
//! in a chain agree on (source maps, metadata).

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Per-loader scratch storage, shared between one loader's pitch and
/// normal invocations within a single run.
pub type Scratch = FxIndexMap<String, Content>;

/// Run-wide environment map shared by every loader in a run.
pub type Environment = FxIndexMap<String, Content>;

/// One positional argument passed between loader phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    /// No value at this position
    #[default]
    Null,
    /// Textual content
    Text(String),
    /// Raw byte content
    Bytes(Vec<u8>),
}

impl Content {
    /// Truthiness as the pitch short-circuit check defines it: `Null` is
    /// falsy, text is falsy iff empty, bytes are always truthy (a raw
    /// buffer counts even when empty).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(text) => !text.is_empty(),
            Self::Bytes(_) => true,
        }
    }

    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the byte content, if this is a byte value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// View any content as text, decoding bytes lossily
    pub fn to_text_lossy(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(text) => text.clone(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Convert a single value to the representation a loader asked for.
/// Same-type values and `Null` pass through untouched; byte-to-text
/// decoding is lossy, matching what build tools do with opaque buffers.
fn convert(value: Content, wants_binary: bool) -> Content {
    match value {
        Content::Text(text) if wants_binary => Content::Bytes(text.into_bytes()),
        Content::Bytes(bytes) if !wants_binary => {
            Content::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        other => other,
    }
}

/// Coerce argument position 0 to match the loader's binary flag before a
/// normal-phase invocation. Positions 1.. always pass through unconverted.
pub fn coerce_first_arg(args: &mut [Content], wants_binary: bool) {
    if let Some(first) = args.first_mut() {
        *first = convert(std::mem::take(first), wants_binary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Content::Null.is_truthy());
        assert!(!Content::Text(String::new()).is_truthy());
        assert!(Content::Text("x".to_owned()).is_truthy());
        // An empty buffer is still truthy, unlike an empty string
        assert!(Content::Bytes(Vec::new()).is_truthy());
        assert!(Content::Bytes(vec![0]).is_truthy());
    }

    #[test]
    fn test_coerce_text_to_bytes() {
        let mut args = vec![Content::from("src"), Content::from("aux")];
        coerce_first_arg(&mut args, true);
        assert_eq!(args[0], Content::Bytes(b"src".to_vec()));
        // Later positions are never converted
        assert_eq!(args[1], Content::from("aux"));
    }

    #[test]
    fn test_coerce_bytes_to_text() {
        let mut args = vec![Content::Bytes(b"src".to_vec())];
        coerce_first_arg(&mut args, false);
        assert_eq!(args[0], Content::from("src"));
    }

    #[test]
    fn test_coerce_same_type_passes_through() {
        let mut args = vec![Content::Bytes(b"raw".to_vec())];
        coerce_first_arg(&mut args, true);
        assert_eq!(args[0], Content::Bytes(b"raw".to_vec()));

        let mut args = vec![Content::from("text")];
        coerce_first_arg(&mut args, false);
        assert_eq!(args[0], Content::from("text"));
    }

    #[test]
    fn test_coerce_null_untouched() {
        let mut args = vec![Content::Null];
        coerce_first_arg(&mut args, true);
        assert_eq!(args[0], Content::Null);
    }

    #[test]
    fn test_coerce_empty_args() {
        let mut args: Vec<Content> = Vec::new();
        coerce_first_arg(&mut args, true);
        assert!(args.is_empty());
    }

    #[test]
    fn test_lossy_byte_decoding() {
        let mut args = vec![Content::Bytes(vec![0x66, 0xff, 0x6f])];
        coerce_first_arg(&mut args, false);
        assert_eq!(args[0].as_text(), Some("f\u{fffd}o"));
    }
}
