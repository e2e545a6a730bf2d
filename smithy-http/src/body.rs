/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use http_body::{Body, SizeHint};
use std::error::Error;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

type BodyError = Box<dyn Error + Send + Sync>;

/// Body stream attached to an [`HttpMessage`](crate::message::HttpMessage)
///
/// A stream is either a single in-memory buffer or a streaming [`hyper::Body`]. Once a stream
/// has been consumed or moved out with [`InputStream::take`] it is left in a `Taken` state
/// and yields no data.
pub struct InputStream {
    inner: Inner,
}

enum Inner {
    Once(Option<Bytes>),
    Streaming(hyper::Body),
    Taken,
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("InputStream");
        match &self.inner {
            Inner::Once(Some(bytes)) => dbg.field("once", &bytes.len()),
            Inner::Once(None) => dbg.field("once", &"<consumed>"),
            Inner::Streaming(_) => dbg.field("streaming", &true),
            Inner::Taken => dbg.field("taken", &true),
        };
        dbg.finish()
    }
}

impl Default for InputStream {
    fn default() -> Self {
        InputStream::empty()
    }
}

impl InputStream {
    pub fn empty() -> Self {
        InputStream {
            inner: Inner::Once(None),
        }
    }

    pub fn from_static(data: &'static [u8]) -> Self {
        Bytes::from_static(data).into()
    }

    /// In-memory contents, if this stream is a buffered stream that hasn't been read
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Once(Some(b)) => Some(b.as_ref()),
            Inner::Once(None) => Some(&b""[..]),
            _ => None,
        }
    }

    /// Exact length of the stream when known ahead of time
    pub fn content_length(&self) -> Option<u64> {
        self.size_hint().exact()
    }

    /// Move the contents out, leaving this stream empty
    pub fn take(&mut self) -> InputStream {
        InputStream {
            inner: std::mem::replace(&mut self.inner, Inner::Taken),
        }
    }
}

impl From<Bytes> for InputStream {
    fn from(bytes: Bytes) -> Self {
        InputStream {
            inner: Inner::Once(Some(bytes)),
        }
    }
}

impl From<Vec<u8>> for InputStream {
    fn from(data: Vec<u8>) -> Self {
        Bytes::from(data).into()
    }
}

impl From<String> for InputStream {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&str> for InputStream {
    fn from(s: &str) -> Self {
        Bytes::copy_from_slice(s.as_bytes()).into()
    }
}

impl From<hyper::Body> for InputStream {
    fn from(body: hyper::Body) -> Self {
        InputStream {
            inner: Inner::Streaming(body),
        }
    }
}

impl Body for InputStream {
    type Data = Bytes;
    type Error = BodyError;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        match &mut self.get_mut().inner {
            Inner::Once(data) => Poll::Ready(data.take().map(Ok)),
            Inner::Streaming(body) => Pin::new(body)
                .poll_data(cx)
                .map(|chunk| chunk.map(|res| res.map_err(|e| e.into()))),
            Inner::Taken => Poll::Ready(None),
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap<HeaderValue>>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Inner::Once(None) | Inner::Taken => true,
            Inner::Once(Some(bytes)) => bytes.is_empty(),
            Inner::Streaming(body) => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Inner::Once(None) | Inner::Taken => SizeHint::with_exact(0),
            Inner::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Inner::Streaming(body) => body.size_hint(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::InputStream;
    use http_body::Body;

    #[tokio::test]
    async fn once_yields_all_data_then_ends() {
        let mut body = InputStream::from("hello");
        assert_eq!(body.content_length(), Some(5));
        let chunk = body.data().await.expect("one chunk").expect("no error");
        assert_eq!(&chunk[..], b"hello");
        assert!(body.data().await.is_none());
        assert!(body.is_end_stream());
    }

    #[test]
    fn take_leaves_an_empty_stream() {
        let mut body = InputStream::from_static(b"abc");
        let taken = body.take();
        assert_eq!(taken.bytes(), Some(&b"abc"[..]));
        assert_eq!(body.content_length(), Some(0));
        assert_eq!(body.bytes(), None);
    }

    #[test]
    fn streaming_length_comes_from_hyper() {
        let body = InputStream::from(hyper::Body::from("four"));
        assert_eq!(body.content_length(), Some(4));
        assert_eq!(body.bytes(), None);
    }
}
