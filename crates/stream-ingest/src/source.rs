use async_trait::async_trait;
use keeper_types::KeeperResult;

use crate::types::RawAccountUpdate;

/// A source of account updates, independent of transport. The real
/// implementation wraps a Yellowstone gRPC subscription; tests use
/// [`ChannelSource`] instead.
#[async_trait]
pub trait AccountUpdateSource: Send {
    async fn next(&mut self) -> KeeperResult<RawAccountUpdate>;
}

/// In-memory source backed by an mpsc channel, for tests and for the
/// reconnect-loop's own unit tests. A closed channel surfaces as a
/// `StreamDropped` error, mirroring a real transport hanging up.
pub struct ChannelSource {
    receiver: tokio::sync::mpsc::Receiver<RawAccountUpdate>,
}

impl ChannelSource {
    pub fn new(receiver: tokio::sync::mpsc::Receiver<RawAccountUpdate>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl AccountUpdateSource for ChannelSource {
    async fn next(&mut self) -> KeeperResult<RawAccountUpdate> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| keeper_types::KeeperError::StreamDropped("channel closed".into()))
    }
}
