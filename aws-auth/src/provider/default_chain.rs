/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::bootstrap::ClientBootstrap;
use crate::provider::chain::CredentialsProviderChain;
use crate::provider::ecs::EcsCredentialsProvider;
use crate::provider::env::EnvironmentVariableCredentialsProvider;
use crate::provider::imds::ImdsCredentialsProvider;
use crate::provider::lazy_caching::{self, LazyCachingCredentialsProvider};
use crate::provider::profile::ProfileFileCredentialsProvider;
use crate::provider::{future, ProvideCredentials};
use aws_types::os_shim_internal::{Env, Fs};
use std::time::Duration;

/// Default AWS Credential Provider Chain
///
/// Resolution order:
/// 1. Environment variables: [`EnvironmentVariableCredentialsProvider`]
/// 2. Shared config (`~/.aws/config`, `~/.aws/credentials`): [`ProfileFileCredentialsProvider`]
/// 3. Container credentials: [`EcsCredentialsProvider`]
/// 4. Instance metadata: [`ImdsCredentialsProvider`]
///
/// The outer provider is wrapped in a refreshing cache.
///
/// ## Example
/// ```rust,no_run
/// use aws_auth::ClientBootstrap;
/// use aws_auth::provider::default_chain::DefaultProviderChain;
///
/// # async fn docs() {
/// let bootstrap = ClientBootstrap::builder().build().expect("rt-tokio provides a connector");
/// let provider = DefaultProviderChain::builder()
///     .bootstrap(bootstrap)
///     .build()
///     .expect("valid configuration");
/// # }
/// ```
#[derive(Debug)]
pub struct DefaultProviderChain(LazyCachingCredentialsProvider);

impl DefaultProviderChain {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl ProvideCredentials for DefaultProviderChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }
}

/// Builder for [`DefaultProviderChain`]
#[derive(Default, Debug)]
pub struct Builder {
    bootstrap: Option<ClientBootstrap>,
    profile_name: Option<String>,
    load_timeout: Option<Duration>,
    env: Option<Env>,
    fs: Option<Fs>,
}

impl Builder {
    /// Connector, sleep and timeouts used by the container and instance metadata providers,
    /// and by the credentials cache
    pub fn bootstrap(mut self, bootstrap: ClientBootstrap) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    /// Read this profile instead of `$AWS_PROFILE` or `default`
    pub fn profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.profile_name = Some(profile_name.into());
        self
    }

    /// Upper bound on a full pass through the chain. Defaults to 5 seconds.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
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

    pub fn build(self) -> Result<DefaultProviderChain, lazy_caching::builder::BuildError> {
        let env = self.env.unwrap_or_default();
        let fs = self.fs.unwrap_or_default();

        let mut profile = ProfileFileCredentialsProvider::builder()
            .env(env.clone())
            .fs(fs);
        if let Some(name) = self.profile_name {
            profile = profile.profile_name(name);
        }

        let mut ecs = EcsCredentialsProvider::builder().env(env.clone());
        let mut imds = ImdsCredentialsProvider::builder().env(env.clone());
        let mut cache = LazyCachingCredentialsProvider::builder();
        if let Some(bootstrap) = self.bootstrap {
            cache = cache.sleep(bootstrap.sleep());
            ecs = ecs.bootstrap(bootstrap.clone());
            imds = imds.bootstrap(bootstrap);
        }
        if let Some(timeout) = self.load_timeout {
            cache = cache.load_timeout(timeout);
        }

        let chain = CredentialsProviderChain::first_try(
            "Environment",
            EnvironmentVariableCredentialsProvider::new_with_env(env),
        )
        .or_else("Profile", profile.build())
        .or_else("EcsContainer", ecs.build())
        .or_else("Ec2InstanceMetadata", imds.build());
        tracing::debug!(providers = ?chain, "built default credentials provider chain");

        Ok(DefaultProviderChain(cache.load(chain).build()?))
    }
}

#[cfg(test)]
mod test {
    use super::DefaultProviderChain;
    use crate::bootstrap::ClientBootstrap;
    use crate::provider::{CredentialsError, ProvideCredentials};
    use aws_types::os_shim_internal::{Env, Fs};
    use smithy_http::connector::DynConnector;
    use smithy_http::test_connection::{ReplayEvent, TestConnection};
    use smithy_http::ConnectorError;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    const CREDS: &str = r#"{
        "Code" : "Success",
        "AccessKeyId" : "ASIANETWORK",
        "SecretAccessKey" : "network-secret",
        "Token" : "network-token",
        "Expiration" : "2099-01-01T00:00:00Z"
    }"#;

    fn chain(env: &[(&str, &str)], fs: Fs, conn: TestConnection) -> DefaultProviderChain {
        DefaultProviderChain::builder()
            .env(Env::from_slice(env))
            .fs(fs)
            .bootstrap(
                ClientBootstrap::builder()
                    .connector(DynConnector::new(conn))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn no_files() -> Fs {
        Fs::from_map(HashMap::new())
    }

    #[tokio::test]
    async fn environment_wins() {
        let conn = TestConnection::empty();
        let provider = chain(
            &[
                ("AWS_ACCESS_KEY_ID", "env-akid"),
                ("AWS_SECRET_ACCESS_KEY", "env-secret"),
                ("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/creds"),
            ],
            no_files(),
            conn.clone(),
        );
        let creds = provider.provide_credentials().await.expect("env credentials");
        assert_eq!(creds.access_key_id(), "env-akid");
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn profile_before_network() {
        let mut files = HashMap::new();
        files.insert(
            "/home/user/.aws/credentials".to_string(),
            "[default]\naws_access_key_id = profile-akid\naws_secret_access_key = profile-secret\n"
                .into(),
        );
        let conn = TestConnection::empty();
        let provider = chain(&[("HOME", "/home/user")], Fs::from_map(files), conn.clone());
        let creds = provider.provide_credentials().await.expect("profile credentials");
        assert_eq!(creds.access_key_id(), "profile-akid");
        assert_eq!(creds.provider_name(), "ProfileFile");
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn container_endpoint() {
        let conn = TestConnection::new(vec![ReplayEvent::respond(200, CREDS)]);
        let provider = chain(
            &[("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/creds")],
            no_files(),
            conn.clone(),
        );
        let creds = provider.provide_credentials().await.expect("container credentials");
        assert_eq!(creds.provider_name(), "EcsContainer");
        // a second call is served from the cache
        provider.provide_credentials().await.expect("cached");
        assert_eq!(conn.requests().len(), 1);
    }

    #[tokio::test]
    async fn instance_metadata_is_last() {
        let conn = TestConnection::new(vec![
            ReplayEvent::respond(200, "session-token"),
            ReplayEvent::respond(200, "instance-role"),
            ReplayEvent::respond(200, CREDS),
        ]);
        let provider = chain(&[], no_files(), conn.clone());
        let creds = provider.provide_credentials().await.expect("imds credentials");
        assert_eq!(creds.access_key_id(), "ASIANETWORK");
        assert_eq!(creds.provider_name(), "Ec2InstanceMetadata");
        assert_eq!(conn.requests().len(), 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn nothing_configured() {
        let conn = TestConnection::new(vec![ReplayEvent::Fail(ConnectorError::Io(
            "connection refused".into(),
        ))]);
        let provider = chain(&[], no_files(), conn);
        let err = provider.provide_credentials().await.expect_err("no credentials anywhere");
        assert!(matches!(err, CredentialsError::CredentialsNotLoaded), "{}", err);
        assert!(logs_contain("provider in chain did not provide credentials"));
    }
}
