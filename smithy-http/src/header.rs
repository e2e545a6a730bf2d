/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Ordered header lists
//!
//! Unlike [`http::HeaderMap`], a [`Headers`] list keeps entries exactly in insertion order,
//! preserves the casing of names and allows the same name more than once. Entries are
//! addressed by index.

use crate::error::HttpError;
use http::header::{HeaderName, HeaderValue};
use std::fmt;

/// A single `name: value` header entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    /// Create a header, validating both the name and the value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, HttpError> {
        let name = name.into();
        let value = value.into();
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(HttpError::InvalidHeaderName(name));
        }
        if HeaderValue::from_str(&value).is_err() {
            return Err(HttpError::InvalidHeaderValue { name });
        }
        Ok(Header { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Anything headers can be copied out of, one index at a time
///
/// Lookups are fallible: a source may be unable to produce an entry even for an index below
/// [`len`](HeaderSource::len). Consumers such as
/// [`HttpMessage::add_headers`](crate::message::HttpMessage::add_headers) skip those entries.
pub trait HeaderSource {
    /// Number of indices that may be looked up
    fn len(&self) -> usize;

    /// Look up the header at `index`
    fn header(&self, index: usize) -> Result<Header, HttpError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered list of headers. Duplicates are allowed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (not distinct names)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate and append `name: value`
    pub fn append(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HttpError> {
        self.entries.push(Header::new(name, value)?);
        Ok(())
    }

    /// Append an already validated header
    pub fn push(&mut self, header: Header) {
        self.entries.push(header);
    }

    /// The entry at `index`
    pub fn get_index(&self, index: usize) -> Result<&Header, HttpError> {
        self.entries
            .get(index)
            .ok_or(HttpError::HeaderIndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    /// Remove the entry at `index`, shifting later entries down by one
    pub fn remove_index(&mut self, index: usize) -> Result<Header, HttpError> {
        if index >= self.entries.len() {
            return Err(HttpError::HeaderIndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// First value for `name`, compared case-insensitively
    pub fn get<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.get_all(name).next()
    }

    /// Every value for `name` in insertion order, compared case-insensitively
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }

    /// Convert into an [`http::HeaderMap`], keeping duplicates
    pub fn to_header_map(&self) -> Result<http::HeaderMap, HttpError> {
        let mut map = http::HeaderMap::with_capacity(self.entries.len());
        for header in &self.entries {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|_| HttpError::InvalidHeaderName(header.name.clone()))?;
            let value = HeaderValue::from_str(&header.value).map_err(|_| {
                HttpError::InvalidHeaderValue {
                    name: header.name.clone(),
                }
            })?;
            map.append(name, value);
        }
        Ok(map)
    }
}

impl HeaderSource for Headers {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn header(&self, index: usize) -> Result<Header, HttpError> {
        self.get_index(index).cloned()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Extend<Header> for Headers {
    fn extend<I: IntoIterator<Item = Header>>(&mut self, iter: I) {
        self.entries.extend(iter)
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Headers {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Header, HeaderSource, Headers};
    use crate::error::HttpError;
    use proptest::prelude::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| Header::new(*k, *v).expect("valid header"))
            .collect()
    }

    #[test]
    fn duplicates_keep_insertion_order() {
        let h = headers(&[("Accept", "a"), ("Host", "example.com"), ("accept", "b")]);
        assert_eq!(h.get_all("ACCEPT").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(h.get("host"), Some("example.com"));
        assert_eq!(h.get_index(2).unwrap().name(), "accept");
    }

    #[test]
    fn lookup_with_a_short_lived_name() {
        let h = headers(&[("X-Amz-Date", "first"), ("x-amz-date", "second")]);
        let found = {
            let name = String::from("X-AMZ-DATE");
            h.get(&name).map(str::to_string)
        };
        assert_eq!(found.as_deref(), Some("first"));
        assert_eq!(h.get("missing"), None);
    }

    #[test]
    fn invalid_components_are_rejected() {
        assert!(matches!(
            Header::new("bad name", "v"),
            Err(HttpError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            Header::new("x-ok", "line\r\nbreak"),
            Err(HttpError::InvalidHeaderValue { .. })
        ));
    }

    #[test]
    fn out_of_range_lookup_fails() {
        let h = headers(&[("a", "1")]);
        assert!(matches!(
            h.header(1),
            Err(HttpError::HeaderIndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn header_map_keeps_duplicates() {
        let h = headers(&[("x-a", "1"), ("x-a", "2")]);
        let map = h.to_header_map().unwrap();
        assert_eq!(map.get_all("x-a").iter().count(), 2);
    }

    proptest! {
        #[test]
        fn remove_index_preserves_order(len in 0usize..16, index in 0usize..24) {
            let mut h: Headers = (0..len)
                .map(|i| Header::new(format!("x-{}", i), i.to_string()).unwrap())
                .collect();
            let before = h.clone();
            match h.remove_index(index) {
                Ok(removed) => {
                    prop_assert!(index < len);
                    prop_assert_eq!(&removed, before.get_index(index).unwrap());
                    let expected: Vec<_> = before
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != index)
                        .map(|(_, h)| h.clone())
                        .collect();
                    prop_assert_eq!(h.iter().cloned().collect::<Vec<_>>(), expected);
                }
                Err(_) => {
                    prop_assert!(index >= len);
                    prop_assert_eq!(h, before);
                }
            }
        }
    }
}
