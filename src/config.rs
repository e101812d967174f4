//! Keeper configuration: one TOML file plus environment overrides for
//! secrets, validated the way the teacher validates `IndexerConfig`
//! (`validator` derive macros, a `validate()` entry point called once at
//! startup before anything touches the network).
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KeeperConfig {
    #[validate(url)]
    pub rpc_url: String,
    #[validate(url)]
    pub stream_url: String,
    pub core_program: String,
    pub distribution_program: String,
    /// The underlying DLMM AMM's program id — distinct from `core_program`
    /// (the wrapper) and needed to derive bin-array PDAs directly (§4.A, §6).
    pub dlmm_program: String,
    pub keeper_key_path: PathBuf,
    pub fee_bps_override: Option<u16>,
    pub debug: bool,
    #[validate(range(min = 16, max = 10_000))]
    pub event_buffer_size: usize,
    #[validate(range(min = 1, max = 20))]
    pub max_retries: u32,
    #[validate(range(min = 1, max = 10_000))]
    pub cooldown_slots: u64,
    #[validate(range(min = 1, max = 256))]
    pub global_inflight: usize,
    #[validate(range(min = 1, max = 64))]
    pub per_pool_inflight: usize,
    #[validate(range(min = 0, max = 23))]
    pub saturday_hour_utc: u32,
    /// Lamports moved per Saturday cycle in the `deposit_sol` step; the
    /// keeper has no cheap off-chain way to read the distribution pool's
    /// true balance, so this is operator-provided rather than derived (§9
    /// Open Question).
    pub saturday_deposit_lamports: u64,
    /// Deposit amount for each fee-rover position opened per pool per side
    /// during the Saturday cycle, same rationale as `saturday_deposit_lamports`.
    pub saturday_fee_rover_lamports: u64,
    pub api: ApiSettings,
    pub monitoring: MonitoringSettings,
    pub address_book: AddressBookSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiSettings {
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MonitoringSettings {
    pub log_level: String,
    pub structured_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddressBookSettings {
    pub path: PathBuf,
    #[validate(range(min = 60, max = 86_400))]
    pub compaction_interval_secs: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            stream_url: "http://127.0.0.1:10000".to_string(),
            core_program: "CoreProgram1111111111111111111111111111111".to_string(),
            distribution_program: "DistProgram111111111111111111111111111111".to_string(),
            dlmm_program: "DLMMProgram11111111111111111111111111111111".to_string(),
            keeper_key_path: "./keeper-key.json".into(),
            fee_bps_override: None,
            debug: false,
            event_buffer_size: 100,
            max_retries: 3,
            cooldown_slots: 20,
            global_inflight: 8,
            per_pool_inflight: 2,
            saturday_hour_utc: 0,
            saturday_deposit_lamports: 0,
            saturday_fee_rover_lamports: 0,
            api: ApiSettings {
                bind_address: "127.0.0.1:8080".to_string(),
            },
            monitoring: MonitoringSettings {
                log_level: "info".to_string(),
                structured_logging: true,
            },
            address_book: AddressBookSettings {
                path: "./data/addressbook".into(),
                compaction_interval_secs: 3600,
            },
        }
    }
}

impl KeeperConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Secrets never live in the checked-in config file (§6 "Persisted
    /// state"): the keeper key path can be overridden from the environment
    /// so deployments can point at a mounted secret without editing TOML.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("KEEPER_KEY_PATH") {
            self.keeper_key_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("RPC_URL") {
            self.rpc_url = url;
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.address_book.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn event_buffer_config(&self) -> event_bus::EventBusConfig {
        event_bus::EventBusConfig {
            ring_capacity: self.event_buffer_size,
            slow_threshold: event_bus::DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn scheduler_config(&self) -> harvest_scheduler::SchedulerConfig {
        let mut config = harvest_scheduler::SchedulerConfig::default();
        config.cooldown_slots = self.cooldown_slots;
        config.max_retries = self.max_retries;
        config.global_inflight = self.global_inflight;
        config.per_pool_inflight = self.per_pool_inflight;
        config
    }

    pub fn executor_config(&self) -> tx_executor::ExecutorConfig {
        let mut config = tx_executor::ExecutorConfig::default();
        config.max_retries = self.max_retries;
        config
    }

    pub fn address_book_config(&self) -> address_book::AddressBookConfig {
        address_book::AddressBookConfig::default()
    }

    pub fn compaction_interval(&self) -> Duration {
        Duration::from_secs(self.address_book.compaction_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        KeeperConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_cooldown_fails_validation() {
        let mut config = KeeperConfig::default();
        config.cooldown_slots = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_replaces_keeper_key_path() {
        std::env::set_var("KEEPER_KEY_PATH", "/tmp/override-key.json");
        let mut config = KeeperConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.keeper_key_path, PathBuf::from("/tmp/override-key.json"));
        std::env::remove_var("KEEPER_KEY_PATH");
    }
}
