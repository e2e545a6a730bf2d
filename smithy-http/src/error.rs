/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors produced while building or inspecting an HTTP message
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpError {
    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),

    #[error("invalid value for header `{name}`")]
    InvalidHeaderValue { name: String },

    #[error("header index {index} out of range for {len} headers")]
    HeaderIndexOutOfRange { index: usize, len: usize },

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("invalid request target: {0}")]
    InvalidUri(#[source] http::Error),

    #[error("message is a response, not a request")]
    NotARequest,

    #[error("a borrowed message cannot be converted into an owned request")]
    BorrowedMessage,
}

/// Failure to dispatch a request through an [`HttpConnector`](crate::connector::HttpConnector)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectorError {
    #[error("request timed out")]
    Timeout,

    #[error("IO error while sending the request: {0}")]
    Io(#[source] BoxError),

    #[error("failed to dispatch request: {0}")]
    Other(#[source] BoxError),
}

impl ConnectorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectorError::Timeout)
    }

    pub fn is_io(&self) -> bool {
        matches!(self, ConnectorError::Io(_))
    }
}
