//! Network link notifications.
//!
//! The WiFi driver reports link changes from its own event task.  Those
//! callbacks must not touch the session: they only enqueue a
//! [`NetworkEvent`] here, and the [`SessionManager`](super::SessionManager)
//! drains the queue at the start of its next tick.
//!
//! ```text
//! ┌──────────────┐  try_send   ┌────────────┐  drain   ┌────────────────┐
//! │ WiFi callback│────────────▶│ LinkEvents │────────▶│ SessionManager │
//! └──────────────┘             └────────────┘  (tick)  └────────────────┘
//! ```
//!
//! Single producer, single consumer.  The queue is `const`-constructible
//! so the binary can keep it in a `static`.

use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

/// Pending notifications; a full queue discards the oldest, so the last
/// reported link state always gets through.
pub const LINK_QUEUE_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Station associated and obtained an address.
    LinkUp { at_ms: u64, ip: Ipv4Addr },
    /// Station lost its association.
    LinkDown { at_ms: u64 },
}

pub struct LinkEvents {
    queue: Channel<CriticalSectionRawMutex, NetworkEvent, LINK_QUEUE_CAP>,
}

impl Default for LinkEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkEvents {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Enqueue a notification.  Safe to call from the driver's event task.
    /// Returns `false` if the queue was full and an older event was
    /// discarded to make room.
    pub fn notify(&self, event: NetworkEvent) -> bool {
        if self.queue.try_send(event).is_ok() {
            return true;
        }
        if let Ok(stale) = self.queue.try_receive() {
            warn!("link: event queue full, discarded {:?}", stale);
        }
        if self.queue.try_send(event).is_err() {
            warn!("link: event queue full, dropped {:?}", event);
        }
        false
    }

    pub fn link_up(&self, at_ms: u64, ip: Ipv4Addr) -> bool {
        self.notify(NetworkEvent::LinkUp { at_ms, ip })
    }

    pub fn link_down(&self, at_ms: u64) -> bool {
        self.notify(NetworkEvent::LinkDown { at_ms })
    }

    /// Pop the oldest pending notification.
    pub fn next(&self) -> Option<NetworkEvent> {
        self.queue.try_receive().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
