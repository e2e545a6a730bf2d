/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Profile file based credentials
//!
//! Credentials are read from the selected profile of `~/.aws/config` and
//! `~/.aws/credentials`; for the same profile, keys in the credentials file win. File
//! locations and the profile name follow [`aws_types::profile::load`].
//!
//! ```ini
//! [default]
//! aws_access_key_id = AKID
//! aws_secret_access_key = secret
//! aws_session_token = token
//! ```
//!
//! Only static keys are supported. Profiles that delegate to another credential source
//! (`role_arn`, `credential_process`, `sso_start_url`, ...) are rejected as invalid
//! configuration.

use crate::provider::{self, future, CredentialsError, ProvideCredentials};
use crate::Credentials;
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::profile::{self, Profile, ProfileFileOverrides, ProfileParseError};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use tracing::Instrument;

const PROFILE_PROVIDER: &str = "ProfileFile";

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const SESSION_TOKEN: &str = "aws_session_token";

/// Keys that select a credential source other than static keys
const UNSUPPORTED_SOURCES: &[&str] = &[
    "role_arn",
    "credential_process",
    "sso_start_url",
    "web_identity_token_file",
];

/// Errors specific to loading credentials from a profile
#[derive(Debug)]
#[non_exhaustive]
pub enum ProfileFileError {
    CouldNotParseProfile(ProfileParseError),
    MissingProfile {
        profile: String,
    },
    /// The profile exists but does not define static keys
    MissingCredentials {
        profile: String,
        missing: &'static str,
    },
    UnsupportedCredentialSource {
        profile: String,
        key: &'static str,
    },
}

impl Display for ProfileFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFileError::CouldNotParseProfile(err) => {
                write!(f, "could not parse profile file: {}", err)
            }
            ProfileFileError::MissingProfile { profile } => {
                write!(f, "profile `{}` was not defined", profile)
            }
            ProfileFileError::MissingCredentials { profile, missing } => write!(
                f,
                "profile `{}` did not contain credentials: `{}` was not set",
                profile, missing
            ),
            ProfileFileError::UnsupportedCredentialSource { profile, key } => write!(
                f,
                "profile `{}` sets `{}`, which is not a supported credential source",
                profile, key
            ),
        }
    }
}

impl Error for ProfileFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProfileFileError::CouldNotParseProfile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProfileFileError> for CredentialsError {
    fn from(err: ProfileFileError) -> Self {
        match err {
            ProfileFileError::MissingProfile { .. } => {
                tracing::debug!(error = %err, "profile not found");
                CredentialsError::CredentialsNotLoaded
            }
            other => CredentialsError::InvalidConfiguration(other.into()),
        }
    }
}

/// AWS profile based credentials provider
///
/// The files are read on every call, so edits to them are picked up without rebuilding the
/// provider. Wrap it in a [`LazyCachingCredentialsProvider`](crate::provider::lazy_caching::LazyCachingCredentialsProvider)
/// to avoid repeated reads.
///
/// ```rust,no_run
/// use aws_auth::provider::profile::ProfileFileCredentialsProvider;
/// let provider = ProfileFileCredentialsProvider::builder()
///     .profile_name("dev")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ProfileFileCredentialsProvider {
    env: Env,
    fs: Fs,
    overrides: ProfileFileOverrides,
}

impl ProfileFileCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn load_credentials(&self) -> provider::Result {
        let profiles = profile::load(&self.fs, &self.env, &self.overrides)
            .map_err(ProfileFileError::CouldNotParseProfile)?;
        if profiles.is_empty() {
            tracing::debug!("no profiles were defined");
            return Err(CredentialsError::CredentialsNotLoaded);
        }
        let selected = profiles.selected_profile();
        let profile = profiles
            .get_profile(selected)
            .ok_or_else(|| ProfileFileError::MissingProfile {
                profile: selected.to_string(),
            })?;
        let creds = static_credentials(profile)?;
        tracing::info!(profile = %selected, "loaded credentials from profile");
        Ok(creds)
    }
}

fn static_credentials(profile: &Profile) -> Result<Credentials, ProfileFileError> {
    let access_key_id = profile.get(ACCESS_KEY_ID);
    let secret_access_key = profile.get(SECRET_ACCESS_KEY);
    if access_key_id.is_none() {
        if let Some(key) = UNSUPPORTED_SOURCES
            .iter()
            .find(|key| profile.get(key).is_some())
        {
            return Err(ProfileFileError::UnsupportedCredentialSource {
                profile: profile.name().to_string(),
                key: *key,
            });
        }
    }
    let missing = |missing| ProfileFileError::MissingCredentials {
        profile: profile.name().to_string(),
        missing,
    };
    Ok(Credentials::new(
        access_key_id.ok_or_else(|| missing(ACCESS_KEY_ID))?,
        secret_access_key.ok_or_else(|| missing(SECRET_ACCESS_KEY))?,
        profile.get(SESSION_TOKEN).map(|token| token.to_string()),
        None,
        PROFILE_PROVIDER,
    ))
}

impl ProvideCredentials for ProfileFileCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.load_credentials().instrument(tracing::info_span!(
            "load_credentials",
            provider = PROFILE_PROVIDER
        )))
    }
}

#[derive(Default, Debug)]
pub struct Builder {
    env: Option<Env>,
    fs: Option<Fs>,
    overrides: ProfileFileOverrides,
}

impl Builder {
    /// Select this profile instead of `$AWS_PROFILE` or `default`
    pub fn profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.overrides.profile_name = Some(profile_name.into());
        self
    }

    /// Read this config file instead of `$AWS_CONFIG_FILE` or `~/.aws/config`
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides.config_file = Some(path.into());
        self
    }

    /// Read this credentials file instead of `$AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`
    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides.credentials_file = Some(path.into());
        self
    }

    pub fn overrides(mut self, overrides: ProfileFileOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[doc(hidden)]
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    #[doc(hidden)]
    pub fn fs(mut self, fs: Fs) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn build(self) -> ProfileFileCredentialsProvider {
        ProfileFileCredentialsProvider {
            env: self.env.unwrap_or_default(),
            fs: self.fs.unwrap_or_default(),
            overrides: self.overrides,
        }
    }
}
