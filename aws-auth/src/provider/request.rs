/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Dispatch of a single metadata request through a [`ClientBootstrap`]

use crate::bootstrap::ClientBootstrap;
use crate::provider::CredentialsError;
use bytes::Bytes;
use smithy_async::future::timeout::Timeout;
use smithy_http::{ConnectorError, HttpError, HttpMessage};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

#[derive(Debug)]
pub(crate) enum DispatchError {
    /// The request could not be built, e.g. the endpoint was not a valid URI
    InvalidRequest(HttpError),
    Connector(ConnectorError),
    TimedOut(Duration),
}

impl DispatchError {
    /// Nothing is listening at the endpoint
    pub(crate) fn is_unreachable(&self) -> bool {
        match self {
            DispatchError::Connector(err) => err.is_io() || err.is_timeout(),
            DispatchError::TimedOut(_) => true,
            DispatchError::InvalidRequest(_) => false,
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidRequest(err) => write!(f, "invalid request: {}", err),
            DispatchError::Connector(err) => write!(f, "failed to dispatch request: {}", err),
            DispatchError::TimedOut(after) => {
                write!(f, "request timed out after {:?}", after)
            }
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::InvalidRequest(err) => Some(err),
            DispatchError::Connector(err) => Some(err),
            DispatchError::TimedOut(_) => None,
        }
    }
}

impl From<DispatchError> for CredentialsError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidRequest(_) => CredentialsError::InvalidConfiguration(err.into()),
            other => CredentialsError::ProviderError(other.into()),
        }
    }
}

/// Send `message` to `endpoint`, bounded by the bootstrap's read timeout
pub(crate) async fn dispatch(
    bootstrap: &ClientBootstrap,
    message: HttpMessage<'static>,
    endpoint: &str,
) -> Result<http::Response<Bytes>, DispatchError> {
    let request = message
        .into_http_request(endpoint)
        .map_err(DispatchError::InvalidRequest)?;
    tracing::debug!(method = %request.method(), uri = %request.uri(), "sending metadata request");
    let timeout = bootstrap.read_timeout();
    let sleep = bootstrap.sleep().sleep(timeout);
    match Timeout::new(bootstrap.connector().call(request), sleep).await {
        Ok(Ok(response)) => {
            tracing::debug!(status = %response.status(), "received metadata response");
            Ok(response)
        }
        Ok(Err(err)) => Err(DispatchError::Connector(err)),
        Err(_timed_out) => Err(DispatchError::TimedOut(timeout)),
    }
}
