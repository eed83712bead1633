use super::messages::Message;
use crate::types::LogLine;

use tokio::select;
use tokio::sync::mpsc;

pub struct Actor {
    inbox: mpsc::UnboundedReceiver<Message>,
    log_rx: mpsc::UnboundedReceiver<LogLine>,
    backlog: Vec<LogLine>,
    subscribers: Vec<mpsc::UnboundedSender<LogLine>>,
    log_open: bool,
}

impl Actor {
    pub fn spawn(
        inbox: mpsc::UnboundedReceiver<Message>,
        log_rx: mpsc::UnboundedReceiver<LogLine>,
    ) {
        let actor = Actor {
            inbox,
            log_rx,
            backlog: Vec::new(),
            subscribers: Vec::new(),
            log_open: true,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        loop {
            select! {
                Some(msg) = self.inbox.recv() => {
                    match msg {
                        Message::Subscribe { subscriber } => self.subscribe(subscriber),
                    }
                }
                maybe_line = self.log_rx.recv(), if self.log_open => {
                    match maybe_line {
                        Some(line) => {
                            // only retain subscribers who have not dropped
                            self.subscribers.retain(|sub| sub.send(line.clone()).is_ok());
                            self.backlog.push(line);
                        }
                        None => {
                            // dropping the senders ends every live stream
                            self.subscribers.clear();
                            self.log_open = false;
                        }
                    }
                }
                // handles dropped and log closed
                else => break,
            }
        }
    }

    fn subscribe(&mut self, subscriber: mpsc::UnboundedSender<LogLine>) {
        for line in &self.backlog {
            if subscriber.send(line.clone()).is_err() {
                return;
            }
        }
        if self.log_open {
            self.subscribers.push(subscriber);
        }
    }
}
