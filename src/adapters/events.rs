use crate::domain::model::ClickEvent;
use crate::domain::ports::{ElementHandle, EventSource};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Replays a fixed list of clicks; `restart` rewinds to the first one.
#[derive(Debug, Clone)]
pub struct ReplayEventSource<E> {
    clicks: Vec<E>,
    position: usize,
}

impl<E: ElementHandle> ReplayEventSource<E> {
    pub fn new(clicks: Vec<E>) -> Self {
        Self { clicks, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.clicks.len() - self.position
    }
}

#[async_trait]
impl<E: ElementHandle> EventSource<E> for ReplayEventSource<E> {
    async fn next_click(&mut self) -> Option<ClickEvent<E>> {
        let trigger = self.clicks.get(self.position)?.clone();
        self.position += 1;
        Some(ClickEvent::new(trigger))
    }

    fn restart(&mut self) {
        self.position = 0;
    }
}

/// Clicks pushed from elsewhere; ends once every [`ClickSender`] is dropped.
#[derive(Debug)]
pub struct ChannelEventSource<E> {
    receiver: mpsc::UnboundedReceiver<ClickEvent<E>>,
}

#[derive(Debug, Clone)]
pub struct ClickSender<E> {
    sender: mpsc::UnboundedSender<ClickEvent<E>>,
}

impl<E: ElementHandle> ClickSender<E> {
    /// Returns false when the dispatcher is gone.
    pub fn click(&self, trigger: E) -> bool {
        self.sender.send(ClickEvent::new(trigger)).is_ok()
    }
}

impl<E: ElementHandle> ChannelEventSource<E> {
    pub fn channel() -> (ClickSender<E>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ClickSender { sender }, Self { receiver })
    }
}

#[async_trait]
impl<E: ElementHandle> EventSource<E> for ChannelEventSource<E> {
    async fn next_click(&mut self) -> Option<ClickEvent<E>> {
        self.receiver.recv().await
    }
}
