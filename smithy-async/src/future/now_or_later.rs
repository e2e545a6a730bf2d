/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! A future that may already hold its value.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

pin_project! {
    /// Future with an explicit "ready now" state
    ///
    /// Static credential providers resolve without doing any work. Wrapping their result in
    /// `NowOrLater::ready` lets them hand back a future without boxing anything, while
    /// providers that actually perform I/O use `NowOrLater::new` with a boxed future.
    pub struct NowOrLater<T, F> {
        #[pin]
        state: State<T, F>,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<T, F> {
        Ready { value: Option<T> },
        Pending { #[pin] future: F },
    }
}

impl<T, F> NowOrLater<T, F> {
    /// Wrap a future that will produce the value later
    pub fn new(future: F) -> Self {
        Self {
            state: State::Pending { future },
        }
    }

    /// Wrap a value that is available immediately
    pub fn ready(value: T) -> Self {
        Self {
            state: State::Ready { value: Some(value) },
        }
    }

    /// True if this future was constructed with [`NowOrLater::ready`] and not yet polled
    pub fn is_ready_now(&self) -> bool {
        matches!(&self.state, State::Ready { value: Some(_) })
    }
}

impl<T, F> Future for NowOrLater<T, F>
where
    F: Future<Output = T>,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            StateProj::Ready { value } => {
                Poll::Ready(value.take().expect("NowOrLater polled after completion"))
            }
            StateProj::Pending { future } => future.poll(cx),
        }
    }
}

#[cfg(test)]
mod test {
    use super::NowOrLater;
    use futures_util::FutureExt;
    use std::future::Ready;

    #[test]
    fn ready_value_does_not_need_a_runtime() {
        let f = NowOrLater::<_, Ready<&str>>::ready("value");
        assert!(f.is_ready_now());
        assert_eq!(f.now_or_never(), Some("value"));
    }

    #[tokio::test]
    async fn boxed_future_is_driven() {
        let f = NowOrLater::new(Box::pin(async { 7 }));
        assert!(!f.is_ready_now());
        assert_eq!(f.await, 7);
    }
}
