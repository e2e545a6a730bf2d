/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The [`AsyncSleep`] trait and its Tokio implementation.
//!
//! Credential providers that talk to the network bound every call with a timeout. They do
//! not assume a runtime; instead they are handed an `AsyncSleep`.

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Produce a future that completes after `duration`
pub trait AsyncSleep: Debug + Send + Sync {
    fn sleep(&self, duration: Duration) -> Sleep;
}

impl<T> AsyncSleep for Arc<T>
where
    T: AsyncSleep + ?Sized,
{
    fn sleep(&self, duration: Duration) -> Sleep {
        T::sleep(self, duration)
    }
}

/// Future returned by [`AsyncSleep::sleep`]
#[must_use]
pub struct Sleep(Pin<Box<dyn Future<Output = ()> + Send + 'static>>);

impl Debug for Sleep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Sleep")
    }
}

impl Sleep {
    pub fn new(future: impl Future<Output = ()> + Send + 'static) -> Sleep {
        Sleep(Box::pin(future))
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

/// Returns the sleep implementation enabled by this crate's features, if any
pub fn default_async_sleep() -> Option<Arc<dyn AsyncSleep>> {
    #[cfg(feature = "rt-tokio")]
    {
        Some(Arc::new(TokioSleep::new()))
    }
    #[cfg(not(feature = "rt-tokio"))]
    {
        None
    }
}

/// [`AsyncSleep`] backed by `tokio::time::sleep`
#[cfg(feature = "rt-tokio")]
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct TokioSleep;

#[cfg(feature = "rt-tokio")]
impl TokioSleep {
    pub fn new() -> TokioSleep {
        TokioSleep
    }
}

#[cfg(feature = "rt-tokio")]
impl AsyncSleep for TokioSleep {
    fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::new(tokio::time::sleep(duration))
    }
}

#[cfg(all(test, feature = "rt-tokio"))]
mod test {
    use super::{default_async_sleep, AsyncSleep};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn tokio_sleep_advances_with_paused_clock() {
        let sleep = default_async_sleep().expect("rt-tokio is enabled");
        let start = tokio::time::Instant::now();
        sleep.sleep(Duration::from_secs(30)).await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
