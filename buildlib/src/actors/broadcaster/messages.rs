use crate::types::LogLine;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Message {
    Subscribe {
        subscriber: mpsc::UnboundedSender<LogLine>,
    },
}
