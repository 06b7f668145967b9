//! Event delivery between the pipeline and whoever is listening.

use super::Event;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Publishes pipeline events.
///
/// Sending never blocks and never fails: events sent after the listener
/// hung up, or through a [`null_sender`], are dropped.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        if let Some(sender) = &self.inner {
            let _ = sender.send(event);
        }
    }
}

/// Unbounded channel; the receiving side is a plain crossbeam receiver
pub fn event_channel() -> (EventSender, Receiver<Event>) {
    let (sender, receiver) = unbounded();
    (
        EventSender {
            inner: Some(sender),
        },
        receiver,
    )
}

/// Sender for runs nobody watches
pub fn null_sender() -> EventSender {
    EventSender::default()
}
