/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Connectors dispatch a request and buffer the response
//!
//! Credentials providers that reach the network (container and instance metadata endpoints)
//! only need small, fully buffered responses, so the seam is a single async call rather
//! than a full `tower::Service`.

use crate::body::InputStream;
use crate::error::ConnectorError;
use bytes::Bytes;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type ConnectorResult = Result<http::Response<Bytes>, ConnectorError>;

/// Send an HTTP request and return the buffered response
pub trait HttpConnector: Debug + Send + Sync {
    fn call(&self, request: http::Request<InputStream>) -> BoxFuture<ConnectorResult>;
}

/// Type-erased, cheaply cloneable [`HttpConnector`]
#[derive(Clone, Debug)]
pub struct DynConnector(Arc<dyn HttpConnector>);

impl DynConnector {
    pub fn new(connector: impl HttpConnector + 'static) -> Self {
        DynConnector(Arc::new(connector))
    }

    pub fn call(&self, request: http::Request<InputStream>) -> BoxFuture<ConnectorResult> {
        self.0.call(request)
    }
}

/// The connector enabled by this crate's features, if any
pub fn default_connector() -> Option<DynConnector> {
    #[cfg(feature = "rt-tokio")]
    {
        Some(DynConnector::new(HyperConnector::new()))
    }
    #[cfg(not(feature = "rt-tokio"))]
    {
        tracing::warn!("no default connector is available; the `rt-tokio` feature is disabled");
        None
    }
}

#[cfg(feature = "rt-tokio")]
pub use hyper_impl::HyperConnector;

#[cfg(feature = "rt-tokio")]
mod hyper_impl {
    use super::{BoxFuture, ConnectorResult, HttpConnector};
    use crate::body::InputStream;
    use crate::error::ConnectorError;
    use std::time::Duration;

    const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Plain-HTTP connector built on the hyper client
    ///
    /// Metadata endpoints are link-local and served over HTTP, so no TLS stack is configured.
    #[derive(Clone, Debug)]
    pub struct HyperConnector {
        client: hyper::Client<hyper::client::HttpConnector, InputStream>,
    }

    impl Default for HyperConnector {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HyperConnector {
        pub fn new() -> Self {
            Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        }

        pub fn with_connect_timeout(timeout: Duration) -> Self {
            let mut http = hyper::client::HttpConnector::new();
            http.set_connect_timeout(Some(timeout));
            HyperConnector {
                client: hyper::Client::builder().build(http),
            }
        }
    }

    impl HttpConnector for HyperConnector {
        fn call(&self, request: http::Request<InputStream>) -> BoxFuture<ConnectorResult> {
            let client = self.client.clone();
            Box::pin(async move {
                let response = client.request(request).await.map_err(classify)?;
                let (parts, body) = response.into_parts();
                let body = hyper::body::to_bytes(body).await.map_err(classify)?;
                Ok(http::Response::from_parts(parts, body))
            })
        }
    }

    fn classify(err: hyper::Error) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::Timeout
        } else if err.is_connect() || err.is_incomplete_message() {
            ConnectorError::Io(err.into())
        } else {
            ConnectorError::Other(err.into())
        }
    }
}
