//! Parsing raw notification payloads into control notifications

use crate::engine::Notification;
use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Extension trait to parse any stream of raw payloads into notifications
pub trait NotificationsExt: Stream<Item = Vec<u8>> {
    /// Keep only control-marker frames, parsed as [`Notification`]s.
    fn notifications(self) -> Notifications<Self>
    where
        Self: Sized,
    {
        Notifications::new(self)
    }
}

impl<T: Stream<Item = Vec<u8>>> NotificationsExt for T {}

pin_project! {
    /// A stream combinator that parses raw payloads and skips non-control frames
    pub struct Notifications<S> {
        #[pin]
        stream: S,
        skipped: u64,
    }
}

impl<S> Notifications<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, skipped: 0 }
    }

    /// Payloads dropped because they were not control frames.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<S: Stream<Item = Vec<u8>>> Stream for Notifications<S> {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(raw)) => match Notification::parse(&raw) {
                    Some(notification) => return Poll::Ready(Some(notification)),
                    None => {
                        *this.skipped += 1;
                        trace!(len = raw.len(), "Skipping non-control notification");
                    }
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
