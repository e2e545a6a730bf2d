/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Connectors useful for testing code that sends requests.

use crate::body::InputStream;
use crate::connector::{BoxFuture, ConnectorResult, HttpConnector};
use crate::error::ConnectorError;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A request as it was received by a [`TestConnection`]
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What a [`TestConnection`] does with the next request
#[derive(Debug)]
pub enum ReplayEvent {
    Respond(http::Response<Bytes>),
    Fail(ConnectorError),
    /// Never complete
    Hang,
}

impl ReplayEvent {
    pub fn respond(status: u16, body: &'static str) -> Self {
        let response = http::Response::builder()
            .status(status)
            .body(Bytes::from_static(body.as_bytes()))
            .expect("valid test response");
        ReplayEvent::Respond(response)
    }
}

#[derive(Debug, Default)]
struct Inner {
    events: VecDeque<ReplayEvent>,
    requests: Vec<CapturedRequest>,
}

/// Connector that replays canned events in order and records every request
///
/// Once the events run out, further requests fail.
#[derive(Clone, Debug, Default)]
pub struct TestConnection {
    inner: Arc<Mutex<Inner>>,
}

impl TestConnection {
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        TestConnection {
            inner: Arc::new(Mutex::new(Inner {
                events: events.into(),
                requests: vec![],
            })),
        }
    }

    /// A connection that fails any request it receives
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl HttpConnector for TestConnection {
    fn call(&self, request: http::Request<InputStream>) -> BoxFuture<ConnectorResult> {
        let (parts, body) = request.into_parts();
        let event = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(CapturedRequest {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                headers: parts.headers.clone(),
                body: Bytes::copy_from_slice(body.bytes().unwrap_or_default()),
            });
            inner.events.pop_front()
        };
        match event {
            Some(ReplayEvent::Respond(response)) => Box::pin(std::future::ready(Ok(response))),
            Some(ReplayEvent::Fail(err)) => Box::pin(std::future::ready(Err(err))),
            Some(ReplayEvent::Hang) => Box::pin(std::future::pending()),
            None => Box::pin(std::future::ready(Err(ConnectorError::Other(
                format!("no response recorded for {} {}", parts.method, parts.uri).into(),
            )))),
        }
    }
}
