/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Locate and read the shared config files

use crate::os_shim_internal::{Env, Fs};
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "~/.aws/config";
const DEFAULT_CREDENTIALS_PATH: &str = "~/.aws/credentials";
const DEFAULT_PROFILE: &str = "default";

/// Explicit choices that take precedence over the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFileOverrides {
    /// Profile to select instead of `$AWS_PROFILE`
    pub profile_name: Option<String>,
    /// Config file to read instead of `$AWS_CONFIG_FILE` or `~/.aws/config`
    pub config_file: Option<PathBuf>,
    /// Credentials file to read instead of `$AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`
    pub credentials_file: Option<PathBuf>,
}

/// In-memory contents of both shared config files
#[derive(Debug, Clone)]
pub struct Source {
    pub config_file: File,
    pub credentials_file: File,
    /// Profile to use. Defaults to `default`.
    pub profile: Cow<'static, str>,
}

/// A configuration file that has been read into memory
#[derive(Debug, Clone, Default)]
pub struct File {
    pub path: String,
    pub contents: String,
}

/// Load a [`Source`] from the given environment and file system
pub fn load(env: &Env, fs: &Fs, overrides: &ProfileFileOverrides) -> Source {
    let config_file = tracing::info_span!("load_config_file").in_scope(|| {
        read(
            fs,
            env,
            overrides.config_file.as_deref(),
            DEFAULT_CONFIG_PATH,
            "AWS_CONFIG_FILE",
        )
    });
    let credentials_file = tracing::info_span!("load_credentials_file").in_scope(|| {
        read(
            fs,
            env,
            overrides.credentials_file.as_deref(),
            DEFAULT_CREDENTIALS_PATH,
            "AWS_SHARED_CREDENTIALS_FILE",
        )
    });
    let profile = match &overrides.profile_name {
        Some(name) => Cow::Owned(name.clone()),
        None => env
            .get_non_empty("AWS_PROFILE")
            .map(Cow::Owned)
            .unwrap_or(Cow::Borrowed(DEFAULT_PROFILE)),
    };
    Source {
        config_file,
        credentials_file,
        profile,
    }
}

/// Read one file, choosing its path from (in order) an explicit override, an environment
/// variable, or the default location. `~` is expanded to the home directory.
///
/// A file that cannot be read is returned as empty.
fn read(
    fs: &Fs,
    env: &Env,
    explicit: Option<&Path>,
    default_path: &str,
    overridden_by_env_var: &str,
) -> File {
    let (path, overridden): (Cow<'_, Path>, bool) = match explicit {
        Some(path) => (Cow::Borrowed(path), true),
        None => match env.get_non_empty(overridden_by_env_var) {
            Some(path) => (Cow::Owned(PathBuf::from(path)), true),
            None => (Cow::Borrowed(Path::new(default_path)), false),
        },
    };
    let expanded = expand_home(&path, env, Os::real());
    tracing::debug!(before = ?path, after = ?expanded, "home directory expanded");
    let data = match fs.read_to_end(&expanded) {
        Ok(data) => data,
        Err(e) => {
            match e.kind() {
                ErrorKind::NotFound if !overridden => {
                    tracing::info!(path = %path.display(), "config file not found")
                }
                ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), env = %overridden_by_env_var, "overridden config file not found")
                }
                _ => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read config file")
                }
            };
            Vec::new()
        }
    };
    let contents = match String::from_utf8(data) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config file did not contain utf-8 encoded data");
            String::new()
        }
    };
    tracing::info!(path = %path.display(), size = contents.len(), "config file loaded");
    File {
        // lossy is fine, the path is only used in error messages
        path: expanded.to_string_lossy().into(),
        contents,
    }
}

fn expand_home(path: &Path, env: &Env, os: Os) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = match home_dir(env, os) {
                Some(dir) => {
                    tracing::debug!(home = ?dir, "performing home directory substitution");
                    dir
                }
                None => {
                    tracing::warn!(
                        "could not determine home directory but home expansion was requested"
                    );
                    PathBuf::new()
                }
            };
            // re-join with this platform's separators
            for component in components {
                expanded.push(component);
            }
            expanded
        }
        _ => path.into(),
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Os {
    Windows,
    NotWindows,
}

impl Os {
    fn real() -> Self {
        if cfg!(windows) {
            Os::Windows
        } else {
            Os::NotWindows
        }
    }
}

fn home_dir(env: &Env, os: Os) -> Option<PathBuf> {
    if let Some(home) = env.get_non_empty("HOME") {
        tracing::debug!(src = "HOME", "loaded home directory");
        return Some(PathBuf::from(home));
    }
    if os == Os::Windows {
        if let Some(home) = env.get_non_empty("USERPROFILE") {
            tracing::debug!(src = "USERPROFILE", "loaded home directory");
            return Some(PathBuf::from(home));
        }
        if let (Some(mut drive), Some(path)) = (
            env.get_non_empty("HOMEDRIVE"),
            env.get_non_empty("HOMEPATH"),
        ) {
            tracing::debug!(src = "HOMEDRIVE/HOMEPATH", "loaded home directory");
            drive.push_str(&path);
            return Some(PathBuf::from(drive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{expand_home, load, Os, ProfileFileOverrides};
    use crate::os_shim_internal::{Env, Fs};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::error::Error;
    use std::fs;
    use std::path::Path;
    use tracing_test::traced_test;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    struct SourceTests {
        tests: Vec<TestCase>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    struct TestCase {
        name: String,
        environment: HashMap<String, String>,
        platform: String,
        profile: Option<String>,
        config_location: String,
        credentials_location: String,
    }

    /// Run every case in `test-data/file-location-tests.json`
    #[test]
    fn run_file_location_tests() -> Result<(), Box<dyn Error>> {
        let tests = fs::read_to_string("test-data/file-location-tests.json")?;
        let tests: SourceTests = serde_json::from_str(&tests)?;
        for test in tests.tests {
            check(test);
        }
        Ok(())
    }

    fn check(test_case: TestCase) {
        let applies = (cfg!(windows) && test_case.platform == "windows")
            || (!cfg!(windows) && test_case.platform != "windows");
        if !applies {
            println!(
                "NOTE: skipping `{}` which only applies to {}",
                test_case.name, test_case.platform
            );
            return;
        }
        let env = Env::from(test_case.environment);
        let source = load(&env, &Fs::from_map(HashMap::new()), &Default::default());
        if let Some(expected_profile) = test_case.profile {
            assert_eq!(source.profile, expected_profile, "{}", test_case.name);
        }
        assert_eq!(
            source.config_file.path, test_case.config_location,
            "{}",
            test_case.name
        );
        assert_eq!(
            source.credentials_file.path, test_case.credentials_location,
            "{}",
            test_case.name
        );
    }

    #[test]
    fn explicit_overrides_beat_the_environment() {
        let env = Env::from_slice(&[
            ("HOME", "/home/me"),
            ("AWS_PROFILE", "from-env"),
            ("AWS_CONFIG_FILE", "/env/config"),
        ]);
        let fs = Fs::from_slice(&[("/explicit/config", "[default]\nregion = us-east-2")]);
        let overrides = ProfileFileOverrides {
            profile_name: Some("explicit".into()),
            config_file: Some("/explicit/config".into()),
            credentials_file: None,
        };
        let source = load(&env, &fs, &overrides);
        assert_eq!(source.profile, "explicit");
        assert_eq!(source.config_file.path, "/explicit/config");
        assert_eq!(source.config_file.contents, "[default]\nregion = us-east-2");
        assert_eq!(source.credentials_file.path, "/home/me/.aws/credentials");
        assert_eq!(source.credentials_file.contents, "");
    }

    #[traced_test]
    #[test]
    fn logs_produced_default() {
        let env = Env::from_slice(&[("HOME", "/user/name")]);
        let fs = Fs::from_slice(&[("/user/name/.aws/config", "[default]\nregion = us-east-1")]);
        let _src = load(&env, &fs, &Default::default());
        assert!(logs_contain("config file loaded"));
        assert!(logs_contain("performing home directory substitution"));
    }

    #[traced_test]
    #[test]
    fn missing_env_override_warns() {
        let env = Env::from_slice(&[("HOME", "/user/name"), ("AWS_CONFIG_FILE", "/nope")]);
        let _src = load(&env, &Fs::from_slice(&[]), &Default::default());
        assert!(logs_contain("overridden config file not found"));
    }

    #[test]
    fn only_expand_home_prefix() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home(Path::new("~aws/config"), &env, Os::NotWindows),
            Path::new("~aws/config")
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn expand_home_on_unix() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home(Path::new("~/.aws/config"), &env, Os::NotWindows),
            Path::new("/user/foo/.aws/config")
        );
    }

    #[test]
    #[cfg(windows)]
    fn expand_home_on_windows() {
        let env = Env::from_slice(&[("HOMEDRIVE", "C:"), ("HOMEPATH", "\\Users\\name")]);
        assert_eq!(
            expand_home(Path::new("~/.aws/config"), &env, Os::Windows),
            Path::new("C:\\Users\\name\\.aws\\config")
        );
    }
}
