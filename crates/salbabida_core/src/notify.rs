//! crates/salbabida_core/src/notify.rs
//!
//! Optional "notify on change" capability shared by the stores. Publishing never
//! blocks and never fails when nobody is listening.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::ports::ChangeStream;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct Notifier<T: Clone + Send + 'static> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Notifier<T> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: T) {
        // An error only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }

    /// Events published after this call. Slow subscribers skip what they missed.
    pub fn subscribe(&self) -> ChangeStream<T> {
        let receiver = self.sender.subscribe();
        Box::pin(futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change subscriber lagged behind, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }))
    }
}

impl<T: Clone + Send + 'static> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
