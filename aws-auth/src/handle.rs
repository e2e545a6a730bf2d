/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Callback-based credentials provider handle
//!
//! [`CredentialsProvider`] wraps any [`ProvideCredentials`] implementation behind a cheaply
//! cloneable handle. Resolutions are spawned onto a tokio runtime and report through a
//! one-shot callback. Each in-flight resolution keeps the provider alive; once the last handle
//! is dropped and every resolution has reported, the optional [`ShutdownOptions`] callback runs.

use crate::bootstrap::ClientBootstrap;
use crate::provider::default_chain::DefaultProviderChain;
use crate::provider::env::EnvironmentVariableCredentialsProvider;
use crate::provider::profile::ProfileFileCredentialsProvider;
use crate::provider::{self, CredentialsError, ProvideCredentials};
use crate::Credentials;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::Instrument;

type Callback = Box<dyn FnOnce(provider::Result) + Send>;

/// One-shot completion for a single credentials request
///
/// The callback runs exactly once: either through [`Completion::complete`], or, if the
/// completion is dropped first, with [`CredentialsError::Unhandled`].
pub struct Completion {
    callback: Option<Callback>,
}

impl Completion {
    pub fn new(callback: impl FnOnce(provider::Result) + Send + 'static) -> Self {
        Completion {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn complete(mut self, result: provider::Result) {
        if let Some(callback) = self.callback.take() {
            callback(result)
        }
    }

    /// Drop the callback without running it
    fn discard(mut self) {
        self.callback.take();
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::debug!("credentials request dropped before completing");
            callback(Err(CredentialsError::Unhandled(
                "credentials resolution was abandoned".into(),
            )))
        }
    }
}

impl Debug for Completion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// Callback that runs once a provider has been released
///
/// The callback runs exactly once, after the last [`CredentialsProvider`] handle is dropped and
/// every in-flight request has reported. It runs on a runtime when one is still running and on a
/// dedicated thread otherwise, never inside the drop that released the provider. Dropping
/// `ShutdownOptions` without attaching it to a provider runs it immediately.
pub struct ShutdownOptions {
    callback: Option<Box<dyn FnOnce() + Send>>,
}

impl ShutdownOptions {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        ShutdownOptions {
            callback: Some(Box::new(callback)),
        }
    }

    fn fire(mut self) {
        if let Some(callback) = self.callback.take() {
            callback()
        }
    }
}

impl Drop for ShutdownOptions {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback()
        }
    }
}

impl Debug for ShutdownOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownOptions")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// A credentials request could not be accepted
///
/// Returned when neither the configured runtime, the runtime current on the calling thread,
/// nor the runtime current at construction is still running. The callback passed to
/// [`CredentialsProvider::get_credentials`] is dropped without running.
#[derive(Debug)]
pub struct RejectedError {
    _private: (),
}

impl Display for RejectedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "credentials request rejected: no running tokio runtime is available"
        )
    }
}

impl Error for RejectedError {}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    match slot.lock() {
        Ok(mut value) => value.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Spawn `work(value)` on the first runtime in `runtimes` that is still running
///
/// A runtime that has shut down drops the task inside `spawn` before it is ever polled. The
/// value is recovered from the dropped task and offered to the next runtime, so it never runs
/// on the calling thread. Returns the value when no runtime accepted it.
fn spawn_on_running<T, Fut>(
    runtimes: impl IntoIterator<Item = Handle>,
    mut value: T,
    work: fn(T) -> Fut,
) -> Result<(), T>
where
    T: Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    for runtime in runtimes {
        let slot = Arc::new(Mutex::new(Some(value)));
        let task_slot = slot.clone();
        let task = runtime.spawn(async move {
            if let Some(value) = take(&task_slot) {
                work(value).await
            }
        });
        if !task.is_finished() {
            return Ok(());
        }
        match take(&slot) {
            // dropped before its first poll
            Some(returned) => {
                tracing::debug!("runtime has shut down; trying the next one");
                value = returned;
            }
            None => return Ok(()),
        }
    }
    Err(value)
}

struct Inner {
    provider: Box<dyn ProvideCredentials>,
    /// Set through [`Builder::runtime`] or a bootstrap
    runtime: Option<Handle>,
    /// Current when the provider was built
    captured_runtime: Option<Handle>,
    shutdown: Mutex<Option<ShutdownOptions>>,
}

impl Inner {
    /// Runtimes to try, in order: configured, current on the calling thread, captured at build
    fn runtimes(&self) -> impl Iterator<Item = Handle> {
        self.runtime
            .clone()
            .into_iter()
            .chain(Handle::try_current().ok())
            .chain(self.captured_runtime.clone())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let shutdown = match self.shutdown.get_mut() {
            Ok(shutdown) => shutdown.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let shutdown = match shutdown {
            Some(shutdown) => shutdown,
            None => return,
        };
        let shutdown = match spawn_on_running(self.runtimes(), shutdown, fire_shutdown) {
            Ok(()) => {
                tracing::debug!("credentials provider released; scheduled shutdown callback");
                return;
            }
            Err(shutdown) => shutdown,
        };
        tracing::debug!(
            "credentials provider released; no running runtime, shutting down on a new thread"
        );
        let spawned = std::thread::Builder::new()
            .name("credentials-provider-shutdown".into())
            .spawn(move || shutdown.fire());
        // a failed spawn drops the closure, and dropping the options fires them here instead
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "could not start shutdown thread");
        }
    }
}

async fn fire_shutdown(shutdown: ShutdownOptions) {
    shutdown.fire()
}

/// A request that has been accepted but has not reported yet
struct InFlight {
    completion: Completion,
    inner: Arc<Inner>,
}

impl InFlight {
    fn resolve(self) -> impl Future<Output = ()> + Send {
        let InFlight { completion, inner } = self;
        async move {
            let result = inner.provider.provide_credentials().await;
            match &result {
                Ok(credentials) => {
                    tracing::debug!(provider = credentials.provider_name(), "credentials resolved")
                }
                Err(err) => tracing::debug!(error = %err, code = err.error_code(), "credentials resolution failed"),
            }
            // report before the provider is released
            completion.complete(result);
            drop(inner);
        }
        .instrument(tracing::debug_span!("get_credentials"))
    }
}

/// Reference-counted handle to a credentials provider
///
/// Cloning the handle shares the provider. When the last clone is dropped and every accepted
/// request has reported, the [`ShutdownOptions`] callback runs off the releasing thread.
///
/// ```rust
/// use aws_auth::{CredentialsProvider, StaticConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = CredentialsProvider::from_static(StaticConfig {
///     access_key: "AKID".into(),
///     secret: "secret".into(),
///     session_token: None,
///     shutdown_options: None,
/// })
/// .expect("keys are not empty");
/// let credentials = provider.credentials().await.expect("static credentials");
/// assert_eq!(credentials.access_key_id(), "AKID");
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialsProvider {
    inner: Arc<Inner>,
}

impl Debug for CredentialsProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsProvider")
            .field("provider", &self.inner.provider)
            .field("runtime", &self.inner.runtime.is_some())
            .field("captured_runtime", &self.inner.captured_runtime.is_some())
            .finish()
    }
}

/// Static keys for [`CredentialsProvider::from_static`]
#[derive(Debug, Default)]
pub struct StaticConfig {
    pub access_key: String,
    pub secret: String,
    pub session_token: Option<String>,
    pub shutdown_options: Option<ShutdownOptions>,
}

/// Options for [`CredentialsProvider::from_env`]
#[derive(Debug, Default)]
pub struct EnvironmentOptions {
    pub shutdown_options: Option<ShutdownOptions>,
}

/// Options for [`CredentialsProvider::from_profile`]
///
/// Unset fields fall back to `$AWS_PROFILE`, `$AWS_CONFIG_FILE` and
/// `$AWS_SHARED_CREDENTIALS_FILE`, then to `default`, `~/.aws/config` and `~/.aws/credentials`.
#[derive(Debug, Default)]
pub struct ProfileOptions {
    pub profile_name_override: Option<String>,
    pub config_file_path_override: Option<PathBuf>,
    pub credentials_file_path_override: Option<PathBuf>,
    pub shutdown_options: Option<ShutdownOptions>,
}

/// Options for [`CredentialsProvider::from_chain_default`]
#[derive(Debug)]
pub struct ChainDefaultConfig {
    pub bootstrap: ClientBootstrap,
    pub shutdown_options: Option<ShutdownOptions>,
}

impl CredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Fixed keys. Fails with `InvalidConfiguration` when the access key or secret is empty.
    pub fn from_static(config: StaticConfig) -> Result<Self, CredentialsError> {
        if config.access_key.is_empty() {
            return Err(CredentialsError::InvalidConfiguration(
                "static credentials require a non-empty access key".into(),
            ));
        }
        if config.secret.is_empty() {
            return Err(CredentialsError::InvalidConfiguration(
                "static credentials require a non-empty secret".into(),
            ));
        }
        let credentials = Credentials::new(
            config.access_key,
            config.secret,
            config.session_token.filter(|token| !token.is_empty()),
            None,
            "Static",
        );
        Builder::default()
            .provider(credentials)
            .set_shutdown_options(config.shutdown_options)
            .build()
    }

    /// Credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`
    pub fn from_env(options: EnvironmentOptions) -> Result<Self, CredentialsError> {
        Builder::default()
            .provider(EnvironmentVariableCredentialsProvider::new())
            .set_shutdown_options(options.shutdown_options)
            .build()
    }

    /// Static keys from the shared config and credentials files
    pub fn from_profile(options: ProfileOptions) -> Result<Self, CredentialsError> {
        let mut profile = ProfileFileCredentialsProvider::builder();
        if let Some(name) = options.profile_name_override {
            profile = profile.profile_name(name);
        }
        if let Some(path) = options.config_file_path_override {
            profile = profile.config_file(path);
        }
        if let Some(path) = options.credentials_file_path_override {
            profile = profile.credentials_file(path);
        }
        Builder::default()
            .provider(profile.build())
            .set_shutdown_options(options.shutdown_options)
            .build()
    }

    /// The default chain: environment, profile, container endpoint, instance metadata
    ///
    /// Resolutions run on the bootstrap's runtime when it has one.
    pub fn from_chain_default(config: ChainDefaultConfig) -> Result<Self, CredentialsError> {
        let runtime = config.bootstrap.runtime().cloned();
        let chain = DefaultProviderChain::builder()
            .bootstrap(config.bootstrap)
            .build()
            .map_err(|err| CredentialsError::InvalidConfiguration(err.into()))?;
        let mut builder = Builder::default()
            .provider(chain)
            .set_shutdown_options(config.shutdown_options);
        builder.runtime = runtime;
        builder.build()
    }

    /// Start resolving credentials and report the outcome to `callback`
    ///
    /// Returns immediately; `callback` never runs inside this call. The request runs on the
    /// configured runtime, else the runtime current on the calling thread, else the runtime
    /// current when the provider was built, skipping any that have shut down. `callback` runs
    /// exactly once with either the credentials or the error. If no runtime accepts the request
    /// it is rejected and `callback` is dropped without running.
    pub fn get_credentials<F>(&self, callback: F) -> Result<(), RejectedError>
    where
        F: FnOnce(provider::Result) + Send + 'static,
    {
        let request = InFlight {
            completion: Completion::new(callback),
            inner: self.inner.clone(),
        };
        match spawn_on_running(self.inner.runtimes(), request, InFlight::resolve) {
            Ok(()) => {
                tracing::trace!("accepted credentials request");
                Ok(())
            }
            Err(request) => {
                tracing::debug!("rejecting credentials request: no running runtime");
                request.completion.discard();
                Err(RejectedError { _private: () })
            }
        }
    }

    /// Resolve credentials, awaiting the outcome
    pub async fn credentials(&self) -> provider::Result {
        let (tx, rx) = oneshot::channel();
        self.get_credentials(move |result| {
            // the receiver may have been dropped; nobody is interested in the result then
            let _ = tx.send(result);
        })
        .map_err(|err| CredentialsError::Unhandled(err.into()))?;
        rx.await.unwrap_or_else(|_| {
            Err(CredentialsError::Unhandled(
                "credentials resolution was abandoned".into(),
            ))
        })
    }
}

/// Builder for a [`CredentialsProvider`] around any [`ProvideCredentials`] implementation
#[derive(Default)]
pub struct Builder {
    provider: Option<Box<dyn ProvideCredentials>>,
    runtime: Option<Handle>,
    shutdown_options: Option<ShutdownOptions>,
}

impl Builder {
    pub fn provider(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Runtime that resolutions are spawned on
    ///
    /// Without one, requests run on the runtime current when credentials are requested, or
    /// failing that the runtime current when [`build`](Builder::build) was called.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn shutdown_options(self, shutdown_options: ShutdownOptions) -> Self {
        self.set_shutdown_options(Some(shutdown_options))
    }

    pub fn set_shutdown_options(mut self, shutdown_options: Option<ShutdownOptions>) -> Self {
        self.shutdown_options = shutdown_options;
        self
    }

    pub fn build(self) -> Result<CredentialsProvider, CredentialsError> {
        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                return Err(CredentialsError::InvalidConfiguration(
                    "a credentials provider must be set".into(),
                ))
            }
        };
        Ok(CredentialsProvider {
            inner: Arc::new(Inner {
                provider,
                runtime: self.runtime,
                captured_runtime: Handle::try_current().ok(),
                shutdown: Mutex::new(self.shutdown_options),
            }),
        })
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("provider", &self.provider)
            .field("runtime", &self.runtime.is_some())
            .field("shutdown_options", &self.shutdown_options)
            .finish()
    }
}
