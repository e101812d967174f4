use std::collections::HashMap;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use keeper_types::{KeeperError, KeeperResult};
use tonic::transport::channel::ClientTlsConfig;
use tracing::warn;
use yellowstone_grpc_client::GeyserGrpcClient;
use yellowstone_grpc_proto::geyser::subscribe_update::UpdateOneof;
use yellowstone_grpc_proto::geyser::{
    SubscribeRequest, SubscribeRequestFilterAccounts, SubscribeRequestPing,
};

use crate::source::AccountUpdateSource;
use crate::types::RawAccountUpdate;

/// Live Geyser account-update subscription for the configured program ids
/// (§4.B). Reconnection/backoff lives one layer up in [`crate::ingest`];
/// this type only knows how to open one subscription and drain it.
pub struct YellowstoneSource {
    stream: std::pin::Pin<
        Box<dyn futures::Stream<Item = Result<yellowstone_grpc_proto::geyser::SubscribeUpdate, tonic::Status>> + Send>,
    >,
    sink: yellowstone_grpc_client::GeyserGrpcClientSink,
}

impl YellowstoneSource {
    pub async fn connect(endpoint: &str, program_ids: &[String]) -> KeeperResult<Self> {
        let mut client = GeyserGrpcClient::build_from_shared(endpoint.to_string())
            .map_err(|e| KeeperError::Network(e.to_string()))?
            .tls_config(ClientTlsConfig::new())
            .map_err(|e| KeeperError::Network(e.to_string()))?
            .connect()
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;

        let mut accounts = HashMap::new();
        accounts.insert(
            "wrapper-programs".to_string(),
            SubscribeRequestFilterAccounts {
                account: vec![],
                owner: program_ids.to_vec(),
                filters: vec![],
                nonempty_txn_signature: None,
            },
        );

        let request = SubscribeRequest {
            accounts,
            slots: HashMap::new(),
            transactions: HashMap::new(),
            transactions_status: HashMap::new(),
            blocks: HashMap::new(),
            blocks_meta: HashMap::new(),
            entry: HashMap::new(),
            commitment: None,
            accounts_data_slice: vec![],
            ping: None,
            from_slot: None,
        };

        let (sink, stream) = client
            .subscribe_with_request(Some(request))
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;

        Ok(Self {
            stream: Box::pin(stream),
            sink,
        })
    }
}

#[async_trait]
impl AccountUpdateSource for YellowstoneSource {
    async fn next(&mut self) -> KeeperResult<RawAccountUpdate> {
        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or_else(|| KeeperError::StreamDropped("yellowstone stream ended".into()))?
                .map_err(|status| KeeperError::StreamDropped(status.to_string()))?;

            match message.update_oneof {
                Some(UpdateOneof::Account(account_update)) => {
                    let Some(account) = account_update.account else {
                        continue;
                    };
                    if account.pubkey.len() != 32 {
                        warn!("dropping account update with malformed pubkey length");
                        continue;
                    }
                    let mut bytes = [0u8; 32];
                    bytes.copy_from_slice(&account.pubkey);
                    return Ok(RawAccountUpdate {
                        pubkey: solana_program::pubkey::Pubkey::new_from_array(bytes),
                        data: account.data,
                        slot: account_update.slot,
                    });
                }
                Some(UpdateOneof::Ping(_)) => {
                    let _ = self
                        .sink
                        .send(SubscribeRequest {
                            ping: Some(SubscribeRequestPing { id: 1 }),
                            ..Default::default()
                        })
                        .await;
                    continue;
                }
                _ => continue,
            }
        }
    }
}
