mod actor;
mod messages;
use crate::types::LogLine;
use actor::Actor;
use messages::Message;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A `Broadcaster` which replays a job's log lines to subscribers and then follows new lines
/// until the job's log is closed.
///
/// This struct is actually an actor handle. The real work is done in the actor spawned by
/// `BroadcasterHandle::spawn`.
#[derive(Clone)]
pub struct BroadcasterHandle {
    sender: mpsc::UnboundedSender<Message>,
}

impl BroadcasterHandle {
    pub fn spawn(log_rx: UnboundedReceiver<LogLine>) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        Actor::spawn(inbox, log_rx);
        Self { sender }
    }

    pub fn subscribe(&self, subscriber: UnboundedSender<LogLine>) {
        let _ = self.sender.send(Message::Subscribe { subscriber });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_gets_backlog_then_live_lines() {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let broadcaster = BroadcasterHandle::spawn(log_rx);
        log_tx.send("first".to_string()).unwrap();
        log_tx.send("second".to_string()).unwrap();

        let (sub_tx, mut sub_rx) = mpsc::unbounded_channel();
        broadcaster.subscribe(sub_tx);
        log_tx.send("third".to_string()).unwrap();
        drop(log_tx);

        let mut received = vec![];
        while let Some(line) = sub_rx.recv().await {
            received.push(line);
        }
        assert_eq!(received, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn subscriber_after_close_gets_backlog_only() {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let broadcaster = BroadcasterHandle::spawn(log_rx);
        log_tx.send("only".to_string()).unwrap();
        drop(log_tx);
        tokio::task::yield_now().await;

        let (sub_tx, mut sub_rx) = mpsc::unbounded_channel();
        broadcaster.subscribe(sub_tx);
        assert_eq!(sub_rx.recv().await.as_deref(), Some("only"));
        assert_eq!(sub_rx.recv().await, None);
    }
}
