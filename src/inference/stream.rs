// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Consumer side of a streaming prediction

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;

/// Tokens of one streaming prediction, in backend order.
///
/// A backend failure arrives as a final `Err` item. Dropping the stream
/// aborts the producing task.
pub struct TokenStream {
    inner: ReceiverStream<Result<String>>,
    producer: JoinHandle<()>,
}

impl TokenStream {
    pub(crate) fn new(receiver: mpsc::Receiver<Result<String>>, producer: JoinHandle<()>) -> Self {
        Self {
            inner: ReceiverStream::new(receiver),
            producer,
        }
    }

    /// Drain into one string, stopping at the first error
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(token) = self.next().await {
            text.push_str(&token?);
        }
        Ok(text)
    }

    /// True once the producer task has exited
    pub fn is_finished(&self) -> bool {
        self.producer.is_finished()
    }
}

impl Stream for TokenStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for TokenStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}
