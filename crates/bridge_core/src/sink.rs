use async_trait::async_trait;
use shared::protocol::DomainEvent;
use tokio::sync::mpsc;
use tracing::warn;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle_event(&self, event: DomainEvent);
}

pub struct ChannelSink {
    events: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn handle_event(&self, event: DomainEvent) {
        if self.events.send(event).is_err() {
            warn!("sink: receiver dropped, discarding event");
        }
    }
}

pub struct DiscardSink;

#[async_trait]
impl EventSink for DiscardSink {
    async fn handle_event(&self, _event: DomainEvent) {}
}
