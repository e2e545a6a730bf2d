/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Adapted from the `Timeout` future in Tokio.

//! Bound another future by a sleep future.

use pin_project_lite::pin_project;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The sleep completed before the wrapped future did
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TimedOutError;

impl Error for TimedOutError {}

impl fmt::Display for TimedOutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out")
    }
}

pin_project! {
    /// Races `value` against `sleep`
    ///
    /// Because the sleep is any future, this works with whatever
    /// [`AsyncSleep`](crate::rt::sleep::AsyncSleep) implementation the caller has.
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    #[derive(Debug)]
    pub struct Timeout<T, S> {
        #[pin]
        value: T,
        #[pin]
        sleep: S,
    }
}

impl<T, S> Timeout<T, S> {
    pub fn new(value: T, sleep: S) -> Timeout<T, S> {
        Timeout { value, sleep }
    }
}

impl<T, S> Future for Timeout<T, S>
where
    T: Future,
    S: Future,
{
    type Output = Result<T::Output, TimedOutError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // a value that is ready at the same time as the deadline still wins
        if let Poll::Ready(v) = this.value.poll(cx) {
            return Poll::Ready(Ok(v));
        }
        this.sleep.poll(cx).map(|_| Err(TimedOutError))
    }
}

#[cfg(test)]
mod tests {
    use super::{TimedOutError, Timeout};
    use std::future::pending;

    #[tokio::test]
    async fn value_before_deadline() {
        assert_eq!(Ok("done"), Timeout::new(async { "done" }, pending::<()>()).await);
    }

    #[tokio::test]
    async fn deadline_before_value() {
        assert_eq!(
            Err(TimedOutError),
            Timeout::new(pending::<()>(), async {}).await
        );
    }

    #[tokio::test]
    async fn value_wins_a_tie() {
        assert_eq!(Ok(1), Timeout::new(async { 1 }, async {}).await);
    }
}
