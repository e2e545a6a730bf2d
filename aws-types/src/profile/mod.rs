/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shared config profiles (`~/.aws/config` and `~/.aws/credentials`)
//!
//! Loading happens in three steps:
//! 1. [`source`] locates and reads both files, honoring `AWS_CONFIG_FILE`,
//!    `AWS_SHARED_CREDENTIALS_FILE`, `AWS_PROFILE` and any explicit overrides.
//! 2. `parse` turns each file into raw sections and properties.
//! 3. `normalize` validates section names and merges both files into a [`ProfileSet`]. For a
//!    given profile, keys from the credentials file take precedence over the config file.

mod normalize;
mod parse;
pub mod source;

use crate::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

pub use parse::ProfileParseError;
pub use source::ProfileFileOverrides;

/// Read, parse and merge the shared config files
///
/// Missing files are not an error: they are treated as empty. A file that exists but cannot be
/// parsed is.
pub fn load(
    fs: &Fs,
    env: &Env,
    overrides: &ProfileFileOverrides,
) -> Result<ProfileSet, ProfileParseError> {
    let source = source::load(env, fs, overrides);
    ProfileSet::parse(source)
}

/// The kind of shared config file. The kind determines which section names are legal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProfileFileKind {
    Config,
    Credentials,
}

/// A set of profiles merged from the config and credentials files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
    selected_profile: Cow<'static, str>,
}

impl ProfileSet {
    /// Parse the contents of a [`source::Source`]
    pub fn parse(source: source::Source) -> Result<Self, ProfileParseError> {
        let mut base = ProfileSet::empty(source.profile);
        for (kind, file) in [
            (ProfileFileKind::Config, &source.config_file),
            (ProfileFileKind::Credentials, &source.credentials_file),
        ] {
            let raw = parse::parse_profile_file(file)?;
            normalize::merge_in(&mut base, raw, kind);
        }
        Ok(base)
    }

    /// An empty profile set that selects `selected_profile`
    pub fn empty(selected_profile: impl Into<Cow<'static, str>>) -> Self {
        ProfileSet {
            profiles: HashMap::new(),
            selected_profile: selected_profile.into(),
        }
    }

    /// Build a profile set directly from `(profile, [(key, value)])` pairs
    pub fn from_profiles<'a>(
        selected_profile: impl Into<Cow<'static, str>>,
        profiles: impl IntoIterator<Item = (&'a str, Vec<(&'a str, &'a str)>)>,
    ) -> Self {
        let mut set = ProfileSet::empty(selected_profile);
        for (name, properties) in profiles {
            let profile = set
                .profiles
                .entry(name.to_string())
                .or_insert_with(|| Profile::new(name, HashMap::new()));
            for (k, v) in properties {
                profile
                    .properties
                    .insert(k.to_string(), Property::new(k.to_string(), v.to_string()));
            }
        }
        set
    }

    /// Look up `key` in the selected profile
    pub fn get(&self, key: &str) -> Option<&str> {
        self.profiles
            .get(self.selected_profile.as_ref())
            .and_then(|profile| profile.get(key))
    }

    pub fn get_profile(&self, profile_name: &str) -> Option<&Profile> {
        self.profiles.get(profile_name)
    }

    /// The name of the profile selected by `AWS_PROFILE` or an explicit override
    pub fn selected_profile(&self) -> &str {
        self.selected_profile.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    fn profile_entry(&mut self, name: &str) -> &mut Profile {
        self.profiles
            .entry(name.to_string())
            .or_insert_with(|| Profile::new(name, HashMap::new()))
    }
}

/// A named profile and its properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    properties: HashMap<String, Property>,
}

impl Profile {
    pub fn new(name: impl Into<String>, properties: HashMap<String, Property>) -> Self {
        Profile {
            name: name.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the property named `key`. Keys are case-insensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key.to_ascii_lowercase().as_str())
            .map(|property| property.value())
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// A key-value property
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    pub fn new(key: String, value: String) -> Self {
        Property { key, value }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Location of a problem within a profile file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub line_number: usize,
    pub path: String,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line_number)
    }
}
