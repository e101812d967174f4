/// Tuning knobs for the per-position state machine (§4.D), all overridable
/// from the root config file (`COOLDOWN_SLOTS`, `MAX_RETRIES`,
/// `GLOBAL_INFLIGHT`, `PER_POOL_INFLIGHT`).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub debounce_slots: u64,
    pub cooldown_slots: u64,
    pub max_retries: u32,
    pub fail_backoff_base_slots: u64,
    pub global_inflight: usize,
    pub per_pool_inflight: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_slots: 2,
            cooldown_slots: 20,
            max_retries: 3,
            fail_backoff_base_slots: 20,
            global_inflight: 8,
            per_pool_inflight: 2,
        }
    }
}
