/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! HTTP messages with index-addressed header lists and replaceable body streams, plus the
//! connector seam used to dispatch them.

pub mod body;
pub mod connector;
pub mod error;
pub mod header;
pub mod message;
pub mod test_connection;

pub use body::InputStream;
pub use error::{ConnectorError, HttpError};
pub use header::{Header, HeaderSource, Headers};
pub use message::{HttpMessage, MessageKind, MessageRecord};
