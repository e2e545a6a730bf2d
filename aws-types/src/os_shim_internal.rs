/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Injectable access to the process environment and the file system
//!
//! Credential providers read environment variables and configuration files. Both are process
//! global, which makes them awkward to test under a multi-threaded test runner. Providers
//! therefore take an [`Env`] and an [`Fs`], which default to the real environment and file
//! system and can be replaced by in-memory fakes.

use std::collections::HashMap;
use std::env::VarError;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File system access
///
/// ```rust
/// use std::collections::HashMap;
/// use aws_types::os_shim_internal::Fs;
/// let fs = Fs::from_map({
///     let mut files = HashMap::new();
///     files.insert("/home/me/.aws/config".to_string(), "[default]\nregion = us-east-1".into());
///     files
/// });
/// assert!(fs.read_to_end("/home/me/.aws/config").is_ok());
/// assert!(fs.read_to_end("/home/me/.aws/credentials").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Fs(Arc<FsInner>);

#[derive(Debug)]
enum FsInner {
    Real,
    Fake(HashMap<OsString, Vec<u8>>),
    /// Real files under `real_root`, visible at `mounted_at`
    Mounted {
        real_root: PathBuf,
        mounted_at: PathBuf,
    },
}

impl Default for Fs {
    fn default() -> Self {
        Fs::real()
    }
}

impl Fs {
    /// Delegate to `std::fs`
    pub fn real() -> Self {
        Fs(Arc::new(FsInner::Real))
    }

    /// In-memory file system keyed by absolute path
    pub fn from_map(files: HashMap<String, Vec<u8>>) -> Self {
        Fs(Arc::new(FsInner::Fake(
            files.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// In-memory file system from `(path, contents)` pairs
    pub fn from_slice(files: &[(&str, &str)]) -> Self {
        Fs(Arc::new(FsInner::Fake(
            files
                .iter()
                .map(|(k, v)| (OsString::from(*k), v.as_bytes().to_vec()))
                .collect(),
        )))
    }

    /// Serve the real directory `test_directory` as if it were located at `mounted_at`
    ///
    /// Paths outside of `mounted_at` are reported as not found.
    pub fn from_test_dir(
        test_directory: impl Into<PathBuf>,
        mounted_at: impl Into<PathBuf>,
    ) -> Self {
        Fs(Arc::new(FsInner::Mounted {
            real_root: test_directory.into(),
            mounted_at: mounted_at.into(),
        }))
    }

    pub fn read_to_end(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        let path = path.as_ref();
        match self.0.as_ref() {
            FsInner::Real => std::fs::read(path),
            FsInner::Fake(files) => files
                .get(path.as_os_str())
                .cloned()
                .ok_or_else(|| io::ErrorKind::NotFound.into()),
            FsInner::Mounted {
                real_root,
                mounted_at,
            } => {
                let relative = path
                    .strip_prefix(mounted_at)
                    .map_err(|_| io::Error::from(io::ErrorKind::NotFound))?;
                std::fs::read(real_root.join(relative))
            }
        }
    }
}

/// Process environment access
///
/// Cloning is cheap: fake environments are shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Env(Arc<EnvInner>);

#[derive(Debug)]
enum EnvInner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for Env {
    fn default() -> Self {
        Env::real()
    }
}

impl Env {
    /// Delegate to [`std::env::var`]
    pub fn real() -> Self {
        Env(Arc::new(EnvInner::Real))
    }

    /// A fake environment containing exactly `vars`
    ///
    /// ```rust
    /// use aws_types::os_shim_internal::Env;
    /// let env = Env::from_slice(&[("HOME", "/home/me"), ("AWS_PROFILE", "dev")]);
    /// assert_eq!(env.get("AWS_PROFILE").unwrap(), "dev");
    /// assert!(env.get("AWS_REGION").is_err());
    /// ```
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        Env(Arc::new(EnvInner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    pub fn get(&self, key: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            EnvInner::Real => std::env::var(key),
            EnvInner::Fake(vars) => vars.get(key).cloned().ok_or(VarError::NotPresent),
        }
    }

    /// The value of `key` if it is set to something other than the empty string
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(vars: HashMap<String, String>) -> Self {
        Env(Arc::new(EnvInner::Fake(vars)))
    }
}
