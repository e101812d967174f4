//! Injectable source of live bin-array reserves for `GET /api/user-bins`
//! (§4.G), abstracted behind a trait the same way `stream-ingest` abstracts
//! its Geyser subscription behind `AccountUpdateSource` — the binary wires up
//! a real RPC-backed implementation, tests use an in-memory fake.
use async_trait::async_trait;
use dlmm_protocol::DecodedBinArray;
use keeper_types::KeeperResult;
use solana_program::pubkey::Pubkey;

#[async_trait]
pub trait BinReserveLookup: Send + Sync {
    /// Fetch and decode every bin-array account named by `pdas`, in the same
    /// order. A PDA that doesn't exist on chain yet (no liquidity ever
    /// deposited into that array) is simply absent from the result rather
    /// than an error.
    async fn fetch_bin_arrays(&self, pdas: &[Pubkey]) -> KeeperResult<Vec<DecodedBinArray>>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// In-memory `BinReserveLookup` keyed by bin-array PDA, for handler tests.
    #[derive(Default)]
    pub struct FakeBinReserveLookup {
        arrays: RwLock<HashMap<Pubkey, DecodedBinArray>>,
    }

    impl FakeBinReserveLookup {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, pda: Pubkey, array: DecodedBinArray) {
            self.arrays.write().await.insert(pda, array);
        }
    }

    #[async_trait]
    impl BinReserveLookup for FakeBinReserveLookup {
        async fn fetch_bin_arrays(&self, pdas: &[Pubkey]) -> KeeperResult<Vec<DecodedBinArray>> {
            let arrays = self.arrays.read().await;
            Ok(pdas.iter().filter_map(|pda| arrays.get(pda).cloned()).collect())
        }
    }
}
