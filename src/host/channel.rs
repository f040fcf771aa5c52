//! In-process host backed by a tokio channel

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{FormHost, Submission};
use crate::error::HostError;

/// Host that forwards every submission to a receiver owned by the embedder
///
/// The embedder renders the form however it likes and answers through
/// [`crate::FormService::resolve`].
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<Submission>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Submission>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FormHost for ChannelHost {
    async fn present(&self, submission: &Submission) -> Result<(), HostError> {
        self.tx
            .send(submission.clone())
            .map_err(|_| HostError::Unavailable("submission receiver dropped".to_string()))
    }
}
