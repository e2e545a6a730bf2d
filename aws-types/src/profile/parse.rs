/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Profile file parser
//!
//! The format is INI-like:
//! ```ini
//! # full line comment
//! [profile dev]  ; comment after a section header
//! aws_access_key_id = AKID
//! s3 =
//!   max_concurrent_requests = 10
//! ```
//! Lines starting with whitespace continue the previous property. Within a property value, a
//! comment must be preceded by whitespace so that values like `a#b` survive.

use super::source::File;
use super::Location;
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Sections as they appear in a single file, before validation
pub(super) type RawProfileSet<'a> = HashMap<&'a str, HashMap<Cow<'a, str>, Cow<'a, str>>>;

pub(super) const WHITESPACE: &[char] = &[' ', '\t'];
const COMMENT: &[char] = &['#', ';'];

/// A profile file could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileParseError {
    location: Location,
    message: String,
}

impl ProfileParseError {
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ProfileParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error parsing {} on line {}:\n  {}",
            self.location.path, self.location.line_number, self.message
        )
    }
}

impl Error for ProfileParseError {}

enum State<'a> {
    Starting,
    ReadingProfile {
        profile: &'a str,
        property: Option<Cow<'a, str>>,
        is_subproperty: bool,
    },
}

struct Parser<'a> {
    data: RawProfileSet<'a>,
    state: State<'a>,
    location: Location,
}

/// Parse a single file into its raw sections
pub(super) fn parse_profile_file(file: &File) -> Result<RawProfileSet<'_>, ProfileParseError> {
    let mut parser = Parser {
        data: HashMap::new(),
        state: State::Starting,
        location: Location {
            line_number: 0,
            path: file.path.clone(),
        },
    };
    parser.parse(&file.contents)?;
    Ok(parser.data)
}

impl<'a> Parser<'a> {
    fn parse(&mut self, contents: &'a str) -> Result<(), ProfileParseError> {
        for (line_number, line) in contents.lines().enumerate() {
            self.location.line_number = line_number + 1;
            // a full-line comment or a blank line terminates nothing and is skipped
            let trimmed = line.trim_matches(WHITESPACE);
            if trimmed.is_empty() || trimmed.starts_with(COMMENT) {
                continue;
            }
            if trimmed.starts_with('[') {
                self.read_section_header(trimmed)?;
            } else if line.starts_with(WHITESPACE) {
                self.read_continuation(trimmed)?;
            } else {
                self.read_property(line)?;
            }
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ProfileParseError {
        ProfileParseError {
            location: self.location.clone(),
            message: message.into(),
        }
    }

    /// `[profile name] # optional comment`
    fn read_section_header(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let line = strip_comment(line, false).trim_matches(WHITESPACE);
        let name = line
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| self.error("profile definition must end with ']'"))?;
        let name = name.trim_matches(WHITESPACE);
        if name.is_empty() {
            return Err(self.error("profile definition must have a name"));
        }
        self.data.entry(name).or_default();
        self.state = State::ReadingProfile {
            profile: name,
            property: None,
            is_subproperty: false,
        };
        Ok(())
    }

    /// `key = value`
    fn read_property(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let profile = match &self.state {
            State::Starting => return Err(self.error("expected a profile definition")),
            State::ReadingProfile { profile, .. } => *profile,
        };
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| self.error("expected an '=' sign defining a property"))?;
        let key = key.trim_matches(WHITESPACE);
        if key.is_empty() {
            return Err(self.error("property did not have a name"));
        }
        let key = to_ascii_lowercase(key);
        let value = strip_comment(value, true).trim_matches(WHITESPACE);
        self.data
            .entry(profile)
            .or_default()
            .insert(key.clone(), Cow::Borrowed(value));
        self.state = State::ReadingProfile {
            profile,
            property: Some(key),
            is_subproperty: value.is_empty(),
        };
        Ok(())
    }

    /// An indented line extending the previous property
    fn read_continuation(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let (profile, property, is_subproperty) = match &self.state {
            State::Starting => return Err(self.error("expected a profile definition")),
            State::ReadingProfile {
                property: None, ..
            } => return Err(self.error("expected a property definition, found continuation")),
            State::ReadingProfile {
                profile,
                property: Some(property),
                is_subproperty,
            } => (*profile, property.clone(), *is_subproperty),
        };
        let line = if is_subproperty {
            if !line.contains('=') {
                return Err(self.error("expected an '=' sign defining a sub-property"));
            }
            strip_comment(line, true).trim_matches(WHITESPACE)
        } else {
            line
        };
        let value = self
            .data
            .entry(profile)
            .or_default()
            .entry(property)
            .or_default();
        let mut extended = value.to_string();
        extended.push('\n');
        extended.push_str(line);
        *value = Cow::Owned(extended);
        Ok(())
    }
}

/// Remove a trailing comment
///
/// In property values a comment only starts after whitespace; section headers accept a
/// comment directly after the closing `]`.
fn strip_comment(line: &str, require_whitespace: bool) -> &str {
    let mut prev_is_whitespace = !require_whitespace;
    for (idx, ch) in line.char_indices() {
        if COMMENT.contains(&ch) && prev_is_whitespace {
            return &line[..idx];
        }
        prev_is_whitespace = !require_whitespace || WHITESPACE.contains(&ch);
    }
    line
}

/// Lowercase `s`, borrowing when it is already lowercase
pub(super) fn to_ascii_lowercase(s: &str) -> Cow<'_, str> {
    if s.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(s.to_ascii_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod test {
    use super::{parse_profile_file, strip_comment, to_ascii_lowercase};
    use crate::profile::source::File;
    use std::borrow::Cow;

    fn file(contents: &str) -> File {
        File {
            path: "~/.aws/config".into(),
            contents: contents.into(),
        }
    }

    #[test]
    fn comments() {
        assert_eq!(strip_comment("value # comment", true), "value ");
        assert_eq!(strip_comment("value#not-a-comment", true), "value#not-a-comment");
        assert_eq!(strip_comment("[default]#comment", false), "[default]");
        assert_eq!(strip_comment("no comment", true), "no comment");
    }

    #[test]
    fn lowercase_borrows_when_possible() {
        assert!(matches!(to_ascii_lowercase("abc"), Cow::Borrowed("abc")));
        assert_eq!(to_ascii_lowercase("AbC"), "abc");
    }

    #[test]
    fn continuation_lines_extend_values() {
        let f = file("[default]\nkey = first\n  second\ns3 =\n  max_concurrent_requests = 10 ; comment\n");
        let parsed = parse_profile_file(&f).expect("valid file");
        let default = &parsed["default"];
        assert_eq!(default["key"], "first\nsecond");
        assert_eq!(default["s3"], "\nmax_concurrent_requests = 10");
    }

    #[test]
    fn property_outside_profile_is_an_error() {
        let err = parse_profile_file(&file("key = value\n[default]")).expect_err("invalid");
        assert_eq!(err.location().line_number, 1);
        assert!(err.to_string().contains("expected a profile definition"));
    }

    #[test]
    fn missing_equals_is_an_error() {
        let err = parse_profile_file(&file("[default]\n\nnot-a-property")).expect_err("invalid");
        assert_eq!(err.location().line_number, 3);
        assert_eq!(err.message(), "expected an '=' sign defining a property");
    }
}
