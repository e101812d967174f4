//! In-memory event ring buffer + fan-out to websocket subscribers and
//! internal consumers (§4.F).
//!
//! Producers (the Scheduler, the Executor, the Saturday Keeper, the Address
//! Book) call [`EventBus::publish`]; consumers call [`EventBus::subscribe`]
//! to get a `feedHistory` replay of the buffer followed by a live
//! `broadcast::Receiver`. Slow subscribers are dropped by `tokio::broadcast`
//! itself once they fall `SLOW_THRESHOLD` messages behind, which is exactly
//! the §4.F backpressure policy: producers never block on a stalled reader.
use std::collections::VecDeque;

use keeper_types::Event;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Number of events retained for replay to newly connecting subscribers (§4.F).
pub const DEFAULT_RING_CAPACITY: usize = 100;

/// Queued-message threshold beyond which `tokio::broadcast` lags out (drops)
/// a slow subscriber rather than letting it block producers (§4.F).
pub const DEFAULT_SLOW_THRESHOLD: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct EventBusConfig {
    pub ring_capacity: usize,
    pub slow_threshold: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }
}

pub struct EventBus {
    ring: RwLock<VecDeque<Event>>,
    ring_capacity: usize,
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.slow_threshold);
        Self {
            ring: RwLock::new(VecDeque::with_capacity(config.ring_capacity)),
            ring_capacity: config.ring_capacity,
            sender,
        }
    }

    /// Append `event` to the ring, evicting the oldest entry once full, then
    /// fan it out to every live subscriber. A publish with zero subscribers
    /// is not an error — `send` failing just means nobody's listening yet.
    pub async fn publish(&self, event: Event) {
        {
            let mut ring = self.ring.write().await;
            if ring.len() == self.ring_capacity {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }
        let _ = self.sender.send(event);
    }

    /// Subscribe for live events, returning a `feedHistory` snapshot of the
    /// ring as it stood at the moment of subscription plus a receiver for
    /// everything published from this point on (§4.F "replayed ... then live
    /// events stream").
    pub async fn subscribe(&self) -> (Event, broadcast::Receiver<Event>) {
        let receiver = self.sender.subscribe();
        let history = self.ring.read().await.iter().cloned().collect();
        (Event::FeedHistory { events: history }, receiver)
    }

    pub async fn len(&self) -> usize {
        self.ring.read().await.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Drain `receiver` into `sink`, logging and returning once the subscriber
/// has lagged past the broadcast channel's capacity (dropped per §4.F) or
/// the channel has no more senders.
pub async fn forward_until_lagged<F, Fut>(mut receiver: broadcast::Receiver<Event>, mut sink: F)
where
    F: FnMut(Event) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if !sink(event).await {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged, dropping per backpressure policy");
                return;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    fn sample_event(bin: i32) -> Event {
        Event::ActiveBinChanged {
            pool: Pubkey::new_unique(),
            previous_bin_id: bin - 1,
            active_bin_id: bin,
            slot: bin as u64,
        }
    }

    #[tokio::test]
    async fn ring_retains_only_the_last_n_events() {
        let bus = EventBus::new(EventBusConfig {
            ring_capacity: 3,
            slow_threshold: 16,
        });
        for bin in 0..5 {
            bus.publish(sample_event(bin)).await;
        }
        assert_eq!(bus.len().await, 3);
    }

    #[tokio::test]
    async fn subscribe_replays_history_then_receives_live_events() {
        let bus = EventBus::new(EventBusConfig::default());
        bus.publish(sample_event(1)).await;
        bus.publish(sample_event(2)).await;

        let (history, mut receiver) = bus.subscribe().await;
        match history {
            Event::FeedHistory { events } => assert_eq!(events.len(), 2),
            other => panic!("expected feedHistory, got {other:?}"),
        }

        bus.publish(sample_event(3)).await;
        let live = receiver.recv().await.unwrap();
        assert_eq!(live.tag(), "activeBinChanged");
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_past_the_threshold() {
        let bus = EventBus::new(EventBusConfig {
            ring_capacity: 16,
            slow_threshold: 4,
        });
        let (_, receiver) = bus.subscribe().await;

        for bin in 0..10 {
            bus.publish(sample_event(bin)).await;
        }

        let mut forwarded = 0;
        let mut lagged = false;
        let mut receiver = receiver;
        loop {
            match receiver.try_recv() {
                Ok(_) => forwarded += 1,
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    lagged = true;
                    break;
                }
                Err(_) => break,
            }
        }
        assert!(lagged, "expected the slow subscriber to observe a lag");
        assert!(forwarded < 10);
    }
}
