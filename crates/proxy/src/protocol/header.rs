//! Ordered header storage with incremental append semantics.
//!
//! Backend parsers and client-side multiplexers both deliver header fields in
//! pieces: a name may arrive in several fragments, followed by a value that may
//! itself be split. [`Headers`] keeps the fields in arrival order (duplicates
//! included, so the message can be re-emitted faithfully) and tracks whether the
//! last field is still receiving its name ("key mode") or its value.
//!
//! Appending to a name is only legal in key mode and appending to a value only
//! outside it. Violations are reported as [`HeaderError`] rather than panicking.

use crate::ensure;
use crate::protocol::HeaderError;

/// A single `(name, value)` pair, kept as the raw bytes it arrived with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderField {
    name: Vec<u8>,
    value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The value as text, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Case-insensitive name comparison.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }

    /// Returns true if this field is `name` and its value contains `token`,
    /// both compared ignoring ASCII case.
    pub fn matches(&self, name: &str, token: &str) -> bool {
        self.is(name) && contains_ignore_ascii_case(&self.value, token.as_bytes())
    }
}

/// Ordered sequence of [`HeaderField`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
    key_mode: bool,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new field and enters key mode.
    pub fn begin_field(&mut self, name: impl Into<Vec<u8>>) {
        self.key_mode = true;
        self.fields.push(HeaderField::new(name, Vec::new()));
    }

    /// Extends the name of the last field.
    pub fn append_key(&mut self, data: impl AsRef<[u8]>) -> Result<(), HeaderError> {
        ensure!(self.key_mode, HeaderError::KeyModeInactive);
        let field = self.fields.last_mut().ok_or(HeaderError::NoField)?;
        field.name.extend_from_slice(data.as_ref());
        Ok(())
    }

    /// Sets the value of the last field and leaves key mode.
    ///
    /// Returns the now finished field so callers can inspect it.
    pub fn finish_value(&mut self, value: impl Into<Vec<u8>>) -> Result<&HeaderField, HeaderError> {
        ensure!(self.key_mode, HeaderError::KeyModeInactive);
        let field = self.fields.last_mut().ok_or(HeaderError::NoField)?;
        self.key_mode = false;
        field.value = value.into();
        Ok(field)
    }

    /// Extends the value of the last field.
    pub fn append_value(&mut self, data: impl AsRef<[u8]>) -> Result<&HeaderField, HeaderError> {
        ensure!(!self.key_mode, HeaderError::KeyModeActive);
        let field = self.fields.last_mut().ok_or(HeaderError::NoField)?;
        field.value.extend_from_slice(data.as_ref());
        Ok(field)
    }

    /// Appends a complete field.
    pub fn push(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &HeaderField {
        self.key_mode = false;
        self.fields.push(HeaderField::new(name, value));
        // just pushed
        &self.fields[self.fields.len() - 1]
    }

    #[inline]
    pub fn is_key_mode(&self) -> bool {
        self.key_mode
    }

    pub fn last(&self) -> Option<&HeaderField> {
        self.fields.last()
    }

    /// First field named `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.fields.iter().find(|field| field.is(name))
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderField> + 'a {
        self.fields.iter().filter(move |field| field.is(name))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.key_mode = false;
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

pub(crate) fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|window| window.eq_ignore_ascii_case(needle))
}
