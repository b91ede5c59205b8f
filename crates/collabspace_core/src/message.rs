//! Message center for cross-cutting notifications.
//!
//! Providers send [`Message`]s here (login required, sync failures, ...) and
//! any caller can subscribe. Payloads are relayed untouched.

use std::sync::Arc;

use crate::events::{CallbackRegistry, SubscriptionId};
use crate::types::Message;

/// Pub/sub relay for [`Message`]s.
#[derive(Debug, Default)]
pub struct MessageCenter {
    registry: CallbackRegistry<Message>,
}

impl MessageCenter {
    /// Create a message center with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all messages. The returned id unsubscribes via [`Self::off_message`].
    pub fn on_message<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.registry.subscribe(Arc::new(callback))
    }

    /// Remove a subscription. Returns `true` if it existed.
    pub fn off_message(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    /// Broadcast a message to every subscriber.
    pub fn send(&self, message: Message) {
        log::debug!(
            "[{}] message {:?}: {}",
            message.provider,
            message.code,
            message.message
        );
        self.registry.emit(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageCode;
    use std::sync::Mutex;

    #[test]
    fn test_relays_messages_to_subscribers() {
        let center = MessageCenter::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        let id = center.on_message(move |m| sink.lock().unwrap().push(m.clone()));

        center.send(Message::new("cloud", MessageCode::LoginRequired, "token expired"));
        assert!(center.off_message(id));
        center.send(Message::new("cloud", MessageCode::LoggedOut, "bye"));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].code, MessageCode::LoginRequired);
    }
}
