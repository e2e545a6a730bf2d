/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HTTP request and response messages
//!
//! An [`HttpMessage`] either owns its [`MessageRecord`] or borrows one that belongs to
//! somebody else (for example a record handed to a callback by a connection). In both cases
//! the message controls the attached body stream: when the message is dropped, the stream
//! is released. An owned record is then released too; a borrowed one is left in place with
//! no body attached.

use crate::body::InputStream;
use crate::error::HttpError;
use crate::header::{Header, HeaderSource, Headers};
use http::{Method, StatusCode};

/// Whether a record is a request or a response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Request { method: Method, path: String },
    Response { status: StatusCode },
}

/// The underlying request/response record
#[derive(Debug)]
pub struct MessageRecord {
    kind: MessageKind,
    headers: Headers,
    body: Option<InputStream>,
}

impl MessageRecord {
    pub fn new(kind: MessageKind) -> Self {
        MessageRecord {
            kind,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&InputStream> {
        self.body.as_ref()
    }
}

enum Record<'a> {
    Owned(MessageRecord),
    Borrowed(&'a mut MessageRecord),
}

/// An HTTP request or response with an ordered header list and an optional body stream
pub struct HttpMessage<'a> {
    record: Record<'a>,
}

impl std::fmt::Debug for HttpMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessage")
            .field("owned", &self.is_owned())
            .field("record", self.record())
            .finish()
    }
}

impl HttpMessage<'static> {
    /// A new owned request for `method` and `path`
    pub fn new_request(method: &str, path: impl Into<String>) -> Result<Self, HttpError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| HttpError::InvalidMethod(method.to_string()))?;
        Ok(Self::owning(MessageRecord::new(MessageKind::Request {
            method,
            path: path.into(),
        })))
    }

    /// A new owned response with `status`
    pub fn new_response(status: StatusCode) -> Self {
        Self::owning(MessageRecord::new(MessageKind::Response { status }))
    }

    /// Take ownership of an existing record
    pub fn owning(record: MessageRecord) -> Self {
        HttpMessage {
            record: Record::Owned(record),
        }
    }
}

impl<'a> HttpMessage<'a> {
    /// Wrap a record without taking ownership of it
    pub fn borrowed(record: &'a mut MessageRecord) -> Self {
        HttpMessage {
            record: Record::Borrowed(record),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.record, Record::Owned(_))
    }

    fn record(&self) -> &MessageRecord {
        match &self.record {
            Record::Owned(record) => record,
            Record::Borrowed(record) => &**record,
        }
    }

    fn record_mut(&mut self) -> &mut MessageRecord {
        match &mut self.record {
            Record::Owned(record) => record,
            Record::Borrowed(record) => &mut **record,
        }
    }

    pub fn kind(&self) -> &MessageKind {
        &self.record().kind
    }

    pub fn method(&self) -> Option<&Method> {
        match self.kind() {
            MessageKind::Request { method, .. } => Some(method),
            MessageKind::Response { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self.kind() {
            MessageKind::Request { path, .. } => Some(path),
            MessageKind::Response { .. } => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self.kind() {
            MessageKind::Response { status } => Some(*status),
            MessageKind::Request { .. } => None,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.record().headers
    }

    pub fn header_count(&self) -> usize {
        self.record().headers.len()
    }

    pub fn add_header(&mut self, header: Header) {
        self.record_mut().headers.push(header);
    }

    /// Copy every header out of `source` and append it, in order
    ///
    /// Indices that `source` fails to produce are skipped. A failed lookup never aborts the
    /// copy, so the remaining headers are still appended.
    pub fn add_headers(&mut self, source: &(impl HeaderSource + ?Sized)) {
        for index in 0..source.len() {
            match source.header(index) {
                Ok(header) => self.add_header(header),
                Err(err) => {
                    tracing::debug!(index, error = %err, "skipping header that could not be read");
                    continue;
                }
            }
        }
    }

    /// Remove the header at `index`
    ///
    /// Returns `false`, leaving the header list untouched, if there is no header at `index`.
    pub fn remove_header(&mut self, index: usize) -> bool {
        self.record_mut().headers.remove_index(index).is_ok()
    }

    /// The header at `index`, if there is one
    pub fn header(&self, index: usize) -> Option<Header> {
        self.record().headers.get_index(index).ok().cloned()
    }

    pub fn body(&self) -> Option<&InputStream> {
        self.record().body.as_ref()
    }

    /// Attach `body`, handing back the stream that was attached before
    ///
    /// Ownership of the previous stream passes to the caller: dropping the returned value
    /// releases it.
    pub fn set_body(&mut self, body: Option<InputStream>) -> Option<InputStream> {
        std::mem::replace(&mut self.record_mut().body, body)
    }

    /// Detach and return the current body stream
    pub fn take_body(&mut self) -> Option<InputStream> {
        self.record_mut().body.take()
    }

    /// Convert an owned request into an [`http::Request`] ready to hand to a connector
    ///
    /// `endpoint` is prepended to the request path, e.g. `http://169.254.169.254`.
    pub fn into_http_request(
        mut self,
        endpoint: &str,
    ) -> Result<http::Request<InputStream>, HttpError> {
        if !self.is_owned() {
            return Err(HttpError::BorrowedMessage);
        }
        let (method, path) = match self.kind() {
            MessageKind::Request { method, path } => (method.clone(), path.clone()),
            MessageKind::Response { .. } => return Err(HttpError::NotARequest),
        };
        let headers = self.headers().to_header_map()?;
        let body = self.take_body().unwrap_or_default();
        let mut request = http::Request::builder()
            .method(method)
            .uri(format!("{}{}", endpoint.trim_end_matches('/'), path))
            .body(body)
            .map_err(HttpError::InvalidUri)?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

impl Drop for HttpMessage<'_> {
    fn drop(&mut self) {
        if let Some(body) = self.take_body() {
            tracing::trace!(owned = self.is_owned(), "releasing message body stream");
            drop(body);
        }
    }
}
