/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Network collaborators for providers that talk to metadata endpoints

use smithy_async::rt::sleep::{default_async_sleep, AsyncSleep};
use smithy_http::connector::DynConnector;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Connector, sleep and runtime used by the container and instance metadata providers
///
/// The container and instance metadata endpoints are link-local and answer quickly when they
/// exist, so both timeouts default to one second.
#[derive(Clone)]
pub struct ClientBootstrap {
    connector: DynConnector,
    sleep: Arc<dyn AsyncSleep>,
    runtime: Option<Handle>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Debug for ClientBootstrap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBootstrap")
            .field("connector", &self.connector)
            .field("sleep", &self.sleep)
            .field("has_runtime", &self.runtime.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl ClientBootstrap {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn connector(&self) -> &DynConnector {
        &self.connector
    }

    pub fn sleep(&self) -> Arc<dyn AsyncSleep> {
        self.sleep.clone()
    }

    /// The runtime resolutions are spawned on, if one was configured
    pub fn runtime(&self) -> Option<&Handle> {
        self.runtime.as_ref()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Bound on each metadata request, from sending the request to reading the whole body
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Builder for [`ClientBootstrap`]
#[derive(Default)]
pub struct Builder {
    connector: Option<DynConnector>,
    sleep: Option<Arc<dyn AsyncSleep>>,
    runtime: Option<Handle>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

/// No connector or sleep implementation was configured and none is enabled by default
#[derive(Debug)]
pub struct BootstrapError {
    missing: &'static str,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no {} was configured and the `rt-tokio` feature is disabled",
            self.missing
        )
    }
}

impl std::error::Error for BootstrapError {}

impl Builder {
    /// Override the HTTP connector
    ///
    /// If the `rt-tokio` feature has been disabled this method MUST be used.
    pub fn connector(mut self, connector: DynConnector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Override the sleep implementation used for timeouts
    ///
    /// If the `rt-tokio` feature has been disabled this method MUST be used.
    pub fn sleep(mut self, sleep: Arc<dyn AsyncSleep>) -> Self {
        self.sleep = Some(sleep);
        self
    }

    /// Run resolutions on this runtime instead of the runtime current when they are requested
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ClientBootstrap, BootstrapError> {
        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let connector = match self.connector {
            Some(connector) => connector,
            None => default_connector_with_timeout(connect_timeout).ok_or(BootstrapError {
                missing: "connector",
            })?,
        };
        let sleep = self
            .sleep
            .or_else(default_async_sleep)
            .ok_or(BootstrapError { missing: "sleep" })?;
        Ok(ClientBootstrap {
            connector,
            sleep,
            runtime: self.runtime,
            connect_timeout,
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
        })
    }
}

#[cfg(feature = "rt-tokio")]
fn default_connector_with_timeout(connect_timeout: Duration) -> Option<DynConnector> {
    Some(DynConnector::new(
        smithy_http::connector::HyperConnector::with_connect_timeout(connect_timeout),
    ))
}

#[cfg(not(feature = "rt-tokio"))]
fn default_connector_with_timeout(_connect_timeout: Duration) -> Option<DynConnector> {
    smithy_http::connector::default_connector()
}

#[cfg(test)]
mod test {
    use super::ClientBootstrap;
    use smithy_async::rt::sleep::TokioSleep;
    use smithy_http::connector::DynConnector;
    use smithy_http::test_connection::TestConnection;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let bootstrap = ClientBootstrap::builder().build().expect("rt-tokio is enabled");
        assert_eq!(bootstrap.connect_timeout(), Duration::from_secs(1));
        assert_eq!(bootstrap.read_timeout(), Duration::from_secs(1));
        assert!(bootstrap.runtime().is_none());
    }

    #[tokio::test]
    async fn overrides() {
        let bootstrap = ClientBootstrap::builder()
            .connector(DynConnector::new(TestConnection::empty()))
            .sleep(Arc::new(TokioSleep::new()))
            .runtime(tokio::runtime::Handle::current())
            .read_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(bootstrap.read_timeout(), Duration::from_millis(250));
        assert!(bootstrap.runtime().is_some());
        assert!(format!("{:?}", bootstrap).contains("TestConnection"));
    }
}
