//! Indexed, reconciled store of pools and positions (§4.C).
//!
//! Owned exclusively by one task; every other component sees read-only
//! snapshots taken under a brief read-lock, never a live handle, so readers
//! never observe a half-applied batch.
use std::collections::HashMap;
use std::sync::Arc;

use keeper_types::{KeeperError, KeeperResult, Pool, Position};
use solana_program::pubkey::Pubkey;
use tokio::sync::RwLock;

#[derive(Default)]
struct Indices {
    pools: HashMap<Pubkey, Pool>,
    positions: HashMap<Pubkey, Position>,
    /// owner -> set of position PDAs
    by_owner: HashMap<Pubkey, Vec<Pubkey>>,
    /// pool -> set of position PDAs
    by_pool: HashMap<Pubkey, Vec<Pubkey>>,
}

impl Indices {
    fn index_position(&mut self, position: &Position) {
        let owner_entries = self.by_owner.entry(position.owner).or_default();
        if !owner_entries.contains(&position.pda) {
            owner_entries.push(position.pda);
        }
        let pool_entries = self.by_pool.entry(position.pool).or_default();
        if !pool_entries.contains(&position.pda) {
            pool_entries.push(position.pda);
        }
    }

    fn deindex_position(&mut self, position: &Position) {
        if let Some(entries) = self.by_owner.get_mut(&position.owner) {
            entries.retain(|pda| pda != &position.pda);
        }
        if let Some(entries) = self.by_pool.get_mut(&position.pool) {
            entries.retain(|pda| pda != &position.pda);
        }
    }
}

/// Consistent, detached view of the registry at the moment of the call.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub pools: Vec<Pool>,
    pub positions: Vec<Position>,
}

pub struct PositionRegistry {
    inner: Arc<RwLock<Indices>>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Indices::default())),
        }
    }

    /// Replace the entire registry contents. Used for the full-scan initial
    /// load (§4.C): enumerate all wrapper-program accounts up front, decode,
    /// then swap in atomically so readers never see a partially-loaded state.
    pub async fn load_all(&self, pools: Vec<Pool>, positions: Vec<Position>) {
        let mut indices = Indices::default();
        for pool in pools {
            indices.pools.insert(pool.address, pool);
        }
        for position in &positions {
            indices.index_position(position);
        }
        for position in positions {
            indices.positions.insert(position.pda, position);
        }
        *self.inner.write().await = indices;
    }

    pub async fn upsert_pool(&self, pool: Pool) {
        let mut indices = self.inner.write().await;
        indices.pools.insert(pool.address, pool);
    }

    /// Upsert a position, loading its pool on demand and retrying once if
    /// the pool hasn't been observed yet (§4.C `Inconsistent` handling).
    /// `load_pool` is only invoked on the retry path, so the common case
    /// never pays for an RPC round trip.
    pub async fn upsert_position<F, Fut>(
        &self,
        position: Position,
        load_pool: F,
    ) -> KeeperResult<()>
    where
        F: FnOnce(Pubkey) -> Fut,
        Fut: std::future::Future<Output = KeeperResult<Pool>>,
    {
        {
            let mut indices = self.inner.write().await;
            if indices.pools.contains_key(&position.pool) {
                indices.index_position(&position);
                indices.positions.insert(position.pda, position);
                return Ok(());
            }
        }

        let pool = load_pool(position.pool).await.map_err(|_| {
            KeeperError::Inconsistent(format!("pool {} not loaded", position.pool))
        })?;

        let mut indices = self.inner.write().await;
        indices.pools.insert(pool.address, pool);
        indices.index_position(&position);
        indices.positions.insert(position.pda, position);
        Ok(())
    }

    pub async fn remove_position(&self, pda: &Pubkey) -> KeeperResult<()> {
        let mut indices = self.inner.write().await;
        let position = indices
            .positions
            .remove(pda)
            .ok_or_else(|| KeeperError::NotFound(pda.to_string()))?;
        indices.deindex_position(&position);
        Ok(())
    }

    pub async fn get_position(&self, pda: &Pubkey) -> KeeperResult<Position> {
        self.inner
            .read()
            .await
            .positions
            .get(pda)
            .cloned()
            .ok_or_else(|| KeeperError::NotFound(pda.to_string()))
    }

    pub async fn get_pool(&self, address: &Pubkey) -> KeeperResult<Pool> {
        self.inner
            .read()
            .await
            .pools
            .get(address)
            .cloned()
            .ok_or_else(|| KeeperError::NotFound(address.to_string()))
    }

    pub async fn positions_by_owner(&self, owner: &Pubkey) -> Vec<Position> {
        let indices = self.inner.read().await;
        indices
            .by_owner
            .get(owner)
            .into_iter()
            .flatten()
            .filter_map(|pda| indices.positions.get(pda).cloned())
            .collect()
    }

    pub async fn positions_by_pool(&self, pool: &Pubkey) -> Vec<Position> {
        let indices = self.inner.read().await;
        indices
            .by_pool
            .get(pool)
            .into_iter()
            .flatten()
            .filter_map(|pda| indices.positions.get(pda).cloned())
            .collect()
    }

    pub async fn all_positions(&self) -> Vec<Position> {
        self.inner.read().await.positions.values().cloned().collect()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let indices = self.inner.read().await;
        RegistrySnapshot {
            pools: indices.pools.values().cloned().collect(),
            positions: indices.positions.values().cloned().collect(),
        }
    }
}

impl Default for PositionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_types::{Side, TokenProgramKind};

    fn sample_pool(address: Pubkey) -> Pool {
        Pool {
            address,
            active_bin_id: 100,
            bin_step: 10,
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            symbol_x: Some("SOL".to_string()),
            symbol_y: Some("USDC".to_string()),
            decimals_x: 9,
            decimals_y: 6,
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            token_program_x: TokenProgramKind::Spl,
            token_program_y: TokenProgramKind::Spl,
            last_updated_slot: 1,
        }
    }

    fn sample_position(pda: Pubkey, owner: Pubkey, pool: Pubkey) -> Position {
        Position {
            pda,
            owner,
            pool,
            liquidity_position: Pubkey::new_unique(),
            side: Side::Sell,
            min_bin: 110,
            max_bin: 120,
            initial_deposit: 1_000,
            cumulative_harvested: 0,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn upsert_then_lookup_by_pda_owner_and_pool() {
        let registry = PositionRegistry::new();
        let pool_key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let pda = Pubkey::new_unique();

        registry.upsert_pool(sample_pool(pool_key)).await;
        registry
            .upsert_position(sample_position(pda, owner, pool_key), |_| async {
                unreachable!("pool already loaded")
            })
            .await
            .unwrap();

        assert!(registry.get_position(&pda).await.is_ok());
        assert_eq!(registry.positions_by_owner(&owner).await.len(), 1);
        assert_eq!(registry.positions_by_pool(&pool_key).await.len(), 1);
    }

    #[tokio::test]
    async fn upsert_position_loads_missing_pool_once_then_retries() {
        let registry = PositionRegistry::new();
        let pool_key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let pda = Pubkey::new_unique();
        let pool = sample_pool(pool_key);

        registry
            .upsert_position(sample_position(pda, owner, pool_key), |requested| {
                let pool = pool.clone();
                async move {
                    assert_eq!(requested, pool_key);
                    Ok(pool)
                }
            })
            .await
            .unwrap();

        assert!(registry.get_pool(&pool_key).await.is_ok());
        assert!(registry.get_position(&pda).await.is_ok());
    }

    #[tokio::test]
    async fn remove_position_clears_all_indices() {
        let registry = PositionRegistry::new();
        let pool_key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let pda = Pubkey::new_unique();

        registry.upsert_pool(sample_pool(pool_key)).await;
        registry
            .upsert_position(sample_position(pda, owner, pool_key), |_| async {
                unreachable!()
            })
            .await
            .unwrap();

        registry.remove_position(&pda).await.unwrap();

        assert!(matches!(
            registry.get_position(&pda).await,
            Err(KeeperError::NotFound(_))
        ));
        assert!(registry.positions_by_owner(&owner).await.is_empty());
        assert!(registry.positions_by_pool(&pool_key).await.is_empty());
    }

    #[tokio::test]
    async fn load_all_replaces_contents_atomically() {
        let registry = PositionRegistry::new();
        let pool_key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let pda = Pubkey::new_unique();

        registry
            .load_all(
                vec![sample_pool(pool_key)],
                vec![sample_position(pda, owner, pool_key)],
            )
            .await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.pools.len(), 1);
        assert_eq!(snapshot.positions.len(), 1);
    }

    #[tokio::test]
    async fn get_position_not_found_is_distinct_error() {
        let registry = PositionRegistry::new();
        let err = registry.get_position(&Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, KeeperError::NotFound(_)));
    }
}
