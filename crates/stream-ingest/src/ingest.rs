use std::future::Future;
use std::time::Duration;

use keeper_types::{Event, KeeperResult};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::processor::{DecimalsLookup, StreamProcessor};
use crate::source::AccountUpdateSource;
use position_registry::PositionRegistry;

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const BACKOFF_MULTIPLIER: u32 = 2;
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Drives one account-update source to completion, reconnecting on drop with
/// exponential backoff (5s, 10s, 20s) for up to [`MAX_RECONNECT_ATTEMPTS`]
/// consecutive failures before declaring the stream offline; after that it
/// keeps retrying at the capped interval rather than giving up entirely
/// (§4.B).
pub async fn run_ingest_loop<S, F, Fut>(
    registry: &PositionRegistry,
    decimals: &dyn DecimalsLookup,
    mut connect: F,
    events: mpsc::Sender<Event>,
) where
    S: AccountUpdateSource,
    F: FnMut() -> Fut,
    Fut: Future<Output = KeeperResult<S>>,
{
    let mut attempt: u32 = 0;

    loop {
        let mut source = match connect().await {
            Ok(source) => {
                attempt = 0;
                source
            }
            Err(err) => {
                attempt += 1;
                let delay = backoff_delay(attempt);
                if attempt > MAX_RECONNECT_ATTEMPTS {
                    error!(%err, attempt, "stream offline, continuing to retry at capped interval");
                } else {
                    warn!(%err, attempt, delay_secs = delay.as_secs(), "failed to connect, retrying");
                }
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        info!("account-update stream connected");
        let processor = StreamProcessor::new(registry);

        loop {
            match source.next().await {
                Ok(update) => {
                    let emitted = processor.process(update, decimals).await;
                    for event in emitted {
                        if events.send(event).await.is_err() {
                            warn!("event channel closed, stopping ingest loop");
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(%err, "stream dropped, reconnecting");
                    break;
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(MAX_RECONNECT_ATTEMPTS);
    INITIAL_BACKOFF * BACKOFF_MULTIPLIER.pow(capped_attempt.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(10));
        assert_eq!(backoff_delay(3), Duration::from_secs(20));
        // Beyond the cap, the delay holds at the third attempt's value
        // rather than continuing to grow.
        assert_eq!(backoff_delay(4), Duration::from_secs(20));
        assert_eq!(backoff_delay(10), Duration::from_secs(20));
    }

    struct FixedDecimals;
    impl DecimalsLookup for FixedDecimals {
        fn decimals_for(&self, _mint: &solana_program::pubkey::Pubkey) -> Option<u8> {
            Some(9)
        }
    }

    #[tokio::test]
    async fn ingest_loop_reconnects_after_stream_drop_and_forwards_events() {
        use crate::source::ChannelSource;
        use crate::types::RawAccountUpdate;
        use dlmm_protocol::POOL_ACCOUNT_LEN;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let registry = PositionRegistry::new();
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let connect_calls = Arc::new(AtomicU32::new(0));

        let mut pool_data = vec![0u8; POOL_ACCOUNT_LEN];
        pool_data[76..80].copy_from_slice(&1i32.to_le_bytes());
        pool_data[80..82].copy_from_slice(&10u16.to_le_bytes());
        let pool_key = solana_program::pubkey::Pubkey::new_unique();

        let connect_calls_for_closure = connect_calls.clone();
        let connect = move || {
            let connect_calls = connect_calls_for_closure.clone();
            let pool_data = pool_data.clone();
            async move {
                let call = connect_calls.fetch_add(1, Ordering::SeqCst);
                if call == 0 {
                    let (tx, rx) = mpsc::channel(1);
                    tx.send(RawAccountUpdate {
                        pubkey: pool_key,
                        data: pool_data,
                        slot: 1,
                    })
                    .await
                    .unwrap();
                    drop(tx); // channel closes right after, forcing a reconnect
                    Ok(ChannelSource::new(rx))
                } else {
                    // Second connection never yields anything; test ends via
                    // the event channel closing once `events_rx` is dropped.
                    let (_tx, rx) = mpsc::channel(1);
                    Ok(ChannelSource::new(rx))
                }
            }
        };

        let decimals = FixedDecimals;
        // The loop never returns on its own; bound it with a timeout instead
        // of spawning, since it borrows `registry` and `decimals` by reference.
        let _ = tokio::time::timeout(
            Duration::from_millis(200),
            run_ingest_loop(&registry, &decimals, connect, events_tx),
        )
        .await;

        assert!(connect_calls.load(Ordering::SeqCst) >= 1);
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.pools.len(), 1);
        drop(events_rx);
    }
}
