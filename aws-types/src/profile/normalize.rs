/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use super::parse::{RawProfileSet, WHITESPACE};
use super::{ProfileFileKind, ProfileSet, Property};
use std::borrow::Cow;

const DEFAULT: &str = "default";
const PROFILE_PREFIX: &str = "profile";

#[derive(Eq, PartialEq, Hash, Debug)]
struct ProfileName<'a> {
    name: &'a str,
    has_profile_prefix: bool,
}

impl ProfileName<'_> {
    fn parse(input: &str) -> ProfileName<'_> {
        let input = input.trim_matches(WHITESPACE);
        let (name, has_profile_prefix) = match input.strip_prefix(PROFILE_PREFIX) {
            // `[profilefoo]` is the profile named `profilefoo`
            Some(stripped) if stripped.starts_with(WHITESPACE) => {
                (stripped.trim_matches(WHITESPACE), true)
            }
            _ => (input, false),
        };
        ProfileName {
            name,
            has_profile_prefix,
        }
    }

    /// Whether this section name is legal in a file of `kind`
    fn valid_for(&self, kind: ProfileFileKind) -> Result<&Self, String> {
        if validate_identifier(self.name).is_err() {
            return Err(format!(
                "profile `{}` ignored because `{}` was not a valid identifier",
                &self.name, &self.name
            ));
        }
        match (self.name, kind, self.has_profile_prefix) {
            (_, ProfileFileKind::Config, true) => Ok(self),
            (DEFAULT, ProfileFileKind::Config, false) => Ok(self),
            (_not_default, ProfileFileKind::Config, false) => Err(format!(
                "profile `{}` ignored because config profiles must be of the form `[profile <name>]`",
                self.name
            )),
            (_, ProfileFileKind::Credentials, true) => Err(format!(
                "profile `{}` ignored because credential profiles must NOT begin with `profile`",
                self.name
            )),
            (_, ProfileFileKind::Credentials, false) => Ok(self),
        }
    }
}

/// Validate `raw` and merge it into `base`
///
/// Invalid section names and property keys are skipped with a warning. When a config file
/// contains both `[profile default]` and `[default]`, only `[profile default]` is used.
pub(super) fn merge_in(base: &mut ProfileSet, raw: RawProfileSet<'_>, kind: ProfileFileKind) {
    let validated: Vec<_> = raw
        .into_iter()
        .map(|(name, properties)| (ProfileName::parse(name), properties))
        .filter_map(|(name, properties)| match name.valid_for(kind) {
            Ok(_) => Some((name, properties)),
            Err(msg) => {
                tracing::warn!(name = ?name.name, kind = ?kind, "{}", msg);
                None
            }
        })
        .collect();

    let ignore_unprefixed_default = validated
        .iter()
        .any(|(name, _)| name.name == DEFAULT && name.has_profile_prefix);

    for (name, properties) in validated {
        if name.name == DEFAULT && !name.has_profile_prefix && ignore_unprefixed_default {
            tracing::warn!("profile `default` ignored because `[profile default]` was found which takes priority");
            continue;
        }
        let profile = base.profile_entry(name.name);
        for (key, value) in properties {
            merge_into_profile(&mut profile.properties, key, value);
        }
    }
}

fn merge_into_profile(
    target: &mut std::collections::HashMap<String, Property>,
    key: Cow<'_, str>,
    value: Cow<'_, str>,
) {
    let key = key.as_ref().trim_matches(WHITESPACE);
    if let Err(e) = validate_identifier(key) {
        tracing::warn!("key ignored because `{}` was not a valid identifier", e);
        return;
    }
    let key = key.to_ascii_lowercase();
    target.insert(key.clone(), Property::new(key, value.into_owned()));
}

/// Identifiers may contain ASCII alphanumerics and `_-/.%@:+`
fn validate_identifier(input: &str) -> Result<&str, &str> {
    input
        .chars()
        .all(|ch| {
            ch.is_ascii_alphanumeric()
                || ['_', '-', '/', '.', '%', '@', ':', '+'].contains(&ch)
        })
        .then(|| input)
        .ok_or(input)
}

#[cfg(test)]
mod tests {
    use super::{merge_in, validate_identifier, ProfileName};
    use crate::profile::parse::RawProfileSet;
    use crate::profile::{ProfileFileKind, ProfileSet};
    use std::borrow::Cow;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    fn raw<'a>(sections: &[(&'a str, &[(&'a str, &'a str)])]) -> RawProfileSet<'a> {
        sections
            .iter()
            .map(|(name, props)| {
                (
                    *name,
                    props
                        .iter()
                        .map(|(k, v)| (Cow::Borrowed(*k), Cow::Borrowed(*v)))
                        .collect::<HashMap<_, _>>(),
                )
            })
            .collect()
    }

    #[test]
    fn section_names() {
        assert_eq!(
            ProfileName::parse("profile name"),
            ProfileName {
                name: "name",
                has_profile_prefix: true
            }
        );
        assert_eq!(
            ProfileName::parse("profilename"),
            ProfileName {
                name: "profilename",
                has_profile_prefix: false
            }
        );
        assert_eq!(
            ProfileName::parse("  profile\tname "),
            ProfileName {
                name: "name",
                has_profile_prefix: true
            }
        );
    }

    #[test]
    fn identifiers() {
        assert_eq!(validate_identifier("abcd-_/.%@:+09"), Ok("abcd-_/.%@:+09"));
        assert_eq!(validate_identifier("a b"), Err("a b"));
        assert_eq!(validate_identifier("a!"), Err("a!"));
    }

    #[test]
    #[traced_test]
    fn config_requires_the_profile_prefix() {
        let mut set = ProfileSet::empty("default");
        merge_in(
            &mut set,
            raw(&[("foo", &[("k", "v")]), ("profile bar", &[("k", "v")])]),
            ProfileFileKind::Config,
        );
        assert!(set.get_profile("foo").is_none());
        assert_eq!(set.get_profile("bar").and_then(|p| p.get("k")), Some("v"));
        assert!(logs_contain(
            "config profiles must be of the form `[profile <name>]`"
        ));
    }

    #[test]
    #[traced_test]
    fn credentials_reject_the_profile_prefix() {
        let mut set = ProfileSet::empty("default");
        merge_in(
            &mut set,
            raw(&[("profile foo", &[("k", "v")]), ("bar", &[("k", "v")])]),
            ProfileFileKind::Credentials,
        );
        assert!(set.get_profile("foo").is_none());
        assert!(set.get_profile("bar").is_some());
        assert!(logs_contain("must NOT begin with `profile`"));
    }

    #[test]
    #[traced_test]
    fn prefixed_default_takes_priority() {
        let mut set = ProfileSet::empty("default");
        merge_in(
            &mut set,
            raw(&[
                ("default", &[("k", "unprefixed")]),
                ("profile default", &[("k", "prefixed")]),
            ]),
            ProfileFileKind::Config,
        );
        assert_eq!(set.get("k"), Some("prefixed"));
        assert!(logs_contain("takes priority"));
    }

    #[test]
    #[traced_test]
    fn invalid_keys_are_dropped() {
        let mut set = ProfileSet::empty("default");
        merge_in(
            &mut set,
            raw(&[("default", &[("bad key", "v"), ("Good_Key", "v")])]),
            ProfileFileKind::Credentials,
        );
        assert_eq!(set.get("good_key"), Some("v"));
        assert_eq!(set.get("bad key"), None);
        assert!(logs_contain("key ignored"));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let mut set = ProfileSet::empty("default");
        merge_in(
            &mut set,
            raw(&[("default", &[("a", "config"), ("b", "config")])]),
            ProfileFileKind::Config,
        );
        merge_in(
            &mut set,
            raw(&[("default", &[("a", "credentials")])]),
            ProfileFileKind::Credentials,
        );
        assert_eq!(set.get("a"), Some("credentials"));
        assert_eq!(set.get("b"), Some("config"));
    }
}
