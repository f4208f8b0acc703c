//! Progress reporting for one query execution.
//!
//! A [`ProgressReporter`] is the write half handed to pipeline stages; the
//! matching [`StatusStream`] is the read half consumed by the caller-facing
//! connection. Events are delivered in emission order and the stream ends right
//! after the single terminal [`StatusEvent::Done`].

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Wire form of the terminal marker.
pub const DONE_MARKER: &str = "[DONE]";

/// Buffered events per execution before `report` waits for the consumer.
const CHANNEL_CAPACITY: usize = 32;

/// One milestone line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Human-readable progress message.
    Progress(String),
    /// Terminal marker; nothing follows it.
    Done,
}

impl StatusEvent {
    /// The line sent to the caller.
    #[must_use]
    pub fn as_line(&self) -> &str {
        match self {
            Self::Progress(message) => message,
            Self::Done => DONE_MARKER,
        }
    }

    /// Returns true for the terminal marker.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_line())
    }
}

/// Create a connected reporter/stream pair for a new execution.
#[must_use]
pub fn channel() -> (ProgressReporter, StatusStream) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let reporter = ProgressReporter { tx: Some(tx) };
    let stream = StatusStream {
        inner: ReceiverStream::new(rx),
    };
    (reporter, stream)
}

/// Write half: pipeline stages push status lines through it.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<StatusEvent>>,
}

impl ProgressReporter {
    /// A reporter with no observer; lines are only logged.
    #[must_use]
    pub const fn silent() -> Self {
        Self { tx: None }
    }

    /// Emit a progress line.
    ///
    /// Waits while the consumer is behind. A consumer that went away is not an
    /// error here; [`Self::cancelled`] is how the execution learns about it.
    pub async fn report(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(status = %message, "Progress");

        if let Some(tx) = &self.tx {
            if tx.send(StatusEvent::Progress(message)).await.is_err() {
                tracing::debug!("Status consumer gone, dropping progress line");
            }
        }
    }

    /// Emit the terminal marker and close the channel.
    pub async fn finish(self) {
        if let Some(tx) = self.tx {
            if tx.send(StatusEvent::Done).await.is_err() {
                tracing::debug!("Status consumer gone before terminal marker");
            }
        }
    }

    /// Resolves once the consumer has dropped its stream. Never resolves for
    /// a silent reporter.
    pub async fn cancelled(&self) {
        match &self.tx {
            Some(tx) => tx.closed().await,
            None => std::future::pending().await,
        }
    }

    /// Returns true if nobody is listening.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.tx.as_ref().is_none_or(mpsc::Sender::is_closed)
    }
}

pin_project! {
    /// Read half: ordered status events for one execution.
    #[derive(Debug)]
    pub struct StatusStream {
        #[pin]
        inner: ReceiverStream<StatusEvent>,
    }
}

impl Stream for StatusStream {
    type Item = StatusEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}
