/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::provider::{self, future, CredentialsError, ProvideCredentials};
use std::borrow::Cow;
use std::fmt::{self, Debug, Formatter};
use tracing::Instrument;

/// Credentials provider that checks a series of inner providers
///
/// Each provider will be checked in turn. The first provider that returns a successful credential
/// will be used. If every provider fails, the error from the last one is returned.
///
/// ## Example
/// ```rust
/// use aws_auth::provider::chain::CredentialsProviderChain;
/// use aws_auth::provider::env::EnvironmentVariableCredentialsProvider;
/// use aws_auth::Credentials;
/// let provider = CredentialsProviderChain::first_try("Environment", EnvironmentVariableCredentialsProvider::new())
///     .or_else("Static", Credentials::from_keys("someacceskeyid", "somesecret", None));
/// ```
pub struct CredentialsProviderChain {
    providers: Vec<(Cow<'static, str>, Box<dyn ProvideCredentials>)>,
}

impl Debug for CredentialsProviderChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|(name, _)| name))
            .finish()
    }
}

impl CredentialsProviderChain {
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        CredentialsProviderChain {
            providers: vec![(name.into(), Box::new(provider))],
        }
    }

    /// A chain with no members; it always fails with `CredentialsNotLoaded`
    pub fn empty() -> Self {
        CredentialsProviderChain { providers: vec![] }
    }

    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers.push((name.into(), Box::new(provider)));
        self
    }

    /// Names of the members, in the order they are tried
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|(name, _)| name.as_ref())
    }

    async fn credentials(&self) -> provider::Result {
        let mut last_error = CredentialsError::CredentialsNotLoaded;
        for (name, provider) in &self.providers {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) => {
                    tracing::info!(provider = %name, "loaded credentials");
                    return Ok(credentials);
                }
                Err(CredentialsError::CredentialsNotLoaded) => {
                    tracing::info!(provider = %name, "provider in chain did not provide credentials");
                    last_error = CredentialsError::CredentialsNotLoaded;
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider failed to provide credentials");
                    last_error = e
                }
            }
        }
        Err(last_error)
    }
}

impl ProvideCredentials for CredentialsProviderChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}

#[cfg(test)]
mod test {
    use super::CredentialsProviderChain;
    use crate::provider::{provide_credentials_fn, CredentialsError, ProvideCredentials};
    use crate::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn counting(
        calls: Arc<AtomicUsize>,
        result: fn() -> crate::provider::Result,
    ) -> impl ProvideCredentials {
        provide_credentials_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { result() }
        })
    }

    #[tokio::test]
    #[traced_test]
    async fn first_success_wins() {
        let later = Arc::new(AtomicUsize::new(0));
        let chain = CredentialsProviderChain::first_try("Missing", counting(Arc::new(AtomicUsize::new(0)), || {
            Err(CredentialsError::CredentialsNotLoaded)
        }))
        .or_else("Static", Credentials::from_keys("static", "secret", None))
        .or_else("Never", counting(later.clone(), || Ok(Credentials::from_keys("never", "x", None))));
        let creds = chain.provide_credentials().await.expect("static member");
        assert_eq!(creds.access_key_id(), "static");
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert!(logs_contain("provider in chain did not provide credentials"));
        assert!(logs_contain("loaded credentials"));
    }

    #[tokio::test]
    async fn errors_do_not_stop_the_chain() {
        let chain = CredentialsProviderChain::first_try(
            "Broken",
            provide_credentials_fn(|| async {
                Err(CredentialsError::ProviderError("boom".into()))
            }),
        )
        .or_else("Static", Credentials::from_keys("static", "secret", None));
        assert_eq!(
            chain.provide_credentials().await.unwrap().access_key_id(),
            "static"
        );
    }

    #[tokio::test]
    async fn last_error_is_returned() {
        let chain = CredentialsProviderChain::first_try(
            "Broken",
            provide_credentials_fn(|| async {
                Err(CredentialsError::ProviderError("first".into()))
            }),
        )
        .or_else(
            "Invalid",
            provide_credentials_fn(|| async {
                Err(CredentialsError::InvalidConfiguration("second".into()))
            }),
        );
        let err = chain.provide_credentials().await.expect_err("all failed");
        assert!(matches!(err, CredentialsError::InvalidConfiguration(_)));
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["Broken", "Invalid"]);
    }

    #[tokio::test]
    async fn empty_chain() {
        let err = CredentialsProviderChain::empty()
            .provide_credentials()
            .await
            .expect_err("no members");
        assert!(matches!(err, CredentialsError::CredentialsNotLoaded));
    }
}
