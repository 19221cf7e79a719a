//! Hierarchical keys.
//!
//! A [`Key`] is an immutable ordered sequence of path segments; the final
//! segment is the terminal name, everything before it the path. The path
//! names the table an object lives in, the whole key names the object.

use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Key
///
/// Renders as `/segment/segment/name`. Construction normalizes away empty
/// segments so rendering round-trips through [`Key::parse`].
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// Build a key from owned segments; empty segments are dropped.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Parse a `/`-separated rendering such as `/users/tom`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::new(text.split('/').map(ToString::to_string).collect())
    }

    /// The terminal name component; empty for the root key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// The path segments, i.e. everything before the terminal name.
    #[must_use]
    pub fn path_segments(&self) -> &[String] {
        let len = self.segments.len();
        &self.segments[..len.saturating_sub(1)]
    }

    /// All segments, path and name.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Descend one level: the child's path is this key in full.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self::new(segments)
    }

    /// Canonical string form, `/a/b/c`. The root key renders as `/`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Canonical rendering of the path portion alone, `/a/b`.
    #[must_use]
    pub(crate) fn render_path(&self) -> String {
        format!("/{}", self.path_segments().join("/"))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<&str> for Key {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

///
/// TESTS
///
