use std::sync::Arc;

use dlmm_protocol::instructions::{build_harvest_instruction, HarvestAccounts};
use keeper_types::{is_benign_log, HarvestIntent, KeeperError, KeeperResult, Outcome, Settlement};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::fee::PriorityFeeTracker;

struct CachedBlockhash {
    hash: Hash,
    fetched_at: Instant,
}

/// Drives the per-intent transaction pipeline described in §4.E: refresh
/// blockhash, resolve CPI accounts, set compute budget, pre-simulate, sign,
/// submit, confirm, retrying classified-transient failures with backoff.
pub struct Executor {
    rpc: Arc<RpcClient>,
    keypair: Arc<Keypair>,
    config: ExecutorConfig,
    fee_tracker: Mutex<PriorityFeeTracker>,
    blockhash: Mutex<Option<CachedBlockhash>>,
}

impl Executor {
    pub fn new(rpc: Arc<RpcClient>, keypair: Arc<Keypair>, config: ExecutorConfig) -> Self {
        Self {
            rpc,
            keypair,
            config,
            fee_tracker: Mutex::new(PriorityFeeTracker::new()),
            blockhash: Mutex::new(None),
        }
    }

    async fn fresh_blockhash(&self, force: bool) -> KeeperResult<Hash> {
        let mut cached = self.blockhash.lock().await;
        let needs_refresh = force
            || cached
                .as_ref()
                .map(|c| c.fetched_at.elapsed() > self.config.blockhash_max_age)
                .unwrap_or(true);

        if needs_refresh {
            let hash = self
                .rpc
                .get_latest_blockhash()
                .await
                .map_err(|e| KeeperError::Network(e.to_string()))?;
            *cached = Some(CachedBlockhash {
                hash,
                fetched_at: Instant::now(),
            });
        }
        Ok(cached.as_ref().unwrap().hash)
    }

    /// Who pays and signs a transaction the Executor submits. For the
    /// ordinary harvest path this is the keeper's own key; for the
    /// permissionless crank path (§4.I) the caller supplies their own.
    pub fn keeper_payer(&self) -> Arc<Keypair> {
        self.keypair.clone()
    }

    /// Execute one harvest intent end to end, retrying transient failures
    /// per §4.E's backoff policy and reporting a single terminal [`Settlement`].
    pub async fn execute(
        &self,
        intent: &HarvestIntent,
        accounts: HarvestAccounts,
        signer: &Keypair,
    ) -> Settlement {
        let mut attempt = 0;
        loop {
            match self.try_once(intent, &accounts, signer, attempt > 0).await {
                Ok(settlement) => return settlement,
                Err(TryError::Transient(err)) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        warn!(intent_id = intent.intent_id, %err, "exhausted retries");
                        return Settlement {
                            intent_id: intent.intent_id,
                            outcome: Outcome::TransientRetry,
                            signature: None,
                            logs: vec![err.to_string()],
                        };
                    }
                    let delay = self.config.backoff_for_attempt(attempt - 1);
                    debug!(intent_id = intent.intent_id, attempt, ?delay, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                }
                Err(TryError::Fatal(err)) => {
                    return Settlement {
                        intent_id: intent.intent_id,
                        outcome: Outcome::Fatal,
                        signature: None,
                        logs: vec![err.to_string()],
                    };
                }
                Err(TryError::Benign(logs)) => {
                    return Settlement {
                        intent_id: intent.intent_id,
                        outcome: Outcome::BenignSkip,
                        signature: None,
                        logs,
                    };
                }
            }
        }
    }

    /// Broadcast an already-signed transaction built and signed by an
    /// external caller (§4.I permissionless crank): the keeper never holds
    /// the caller's key, so there is no retry-by-resigning here — a single
    /// simulate-then-send-then-confirm pass, with `sig_verify` left on since
    /// we didn't build the signature ourselves.
    pub async fn submit_signed(&self, transaction: Transaction) -> KeeperResult<String> {
        let sim_config = RpcSimulateTransactionConfig {
            sig_verify: true,
            replace_recent_blockhash: false,
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };
        let simulation = self
            .rpc
            .simulate_transaction_with_config(&transaction, sim_config)
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;

        if let Some(err) = simulation.value.err {
            let logs = simulation.value.logs.unwrap_or_default();
            if logs.iter().any(|l| is_benign_log(l)) {
                return Err(KeeperError::SimulationFailed(format!(
                    "benign: {err} ({logs:?})"
                )));
            }
            return Err(KeeperError::SimulationFailed(format!("{err} ({logs:?})")));
        }

        let signature = self
            .rpc
            .send_transaction_with_config(
                &transaction,
                solana_client::rpc_config::RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;

        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(&[signature])
                .await
                .map_err(|e| KeeperError::Network(e.to_string()))?;

            if let Some(Some(status)) = statuses.value.first().cloned() {
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    if let Some(err) = status.err {
                        return Err(KeeperError::TransactionFatal(err.to_string()));
                    }
                    info!(%signature, "crank transaction confirmed");
                    return Ok(signature.to_string());
                }
            }

            if Instant::now() >= deadline {
                return Err(KeeperError::Network("confirmation window elapsed".into()));
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    /// Latest blockhash for building an unsigned transaction the caller will
    /// sign externally (§4.I), without touching the cache used by the
    /// ordinary harvest path.
    pub async fn latest_blockhash(&self) -> KeeperResult<Hash> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))
    }

    /// Whether `pubkey` currently exists on-chain, used to resolve the
    /// bin-array bitmap extension (§6): present pools pass the derived PDA
    /// writable, pools without one pass the DLMM program id read-only.
    pub async fn account_exists(&self, pubkey: &Pubkey) -> KeeperResult<bool> {
        let response = self
            .rpc
            .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;
        Ok(response.value.is_some())
    }

    /// Sign and submit `instructions` with the keeper's own key, retrying
    /// classified-transient failures the same way [`Executor::execute`] does
    /// for harvests. Used by the Saturday Keeper (§4.H), whose steps carry
    /// no [`HarvestIntent`] to key a [`Settlement`] against.
    pub async fn submit_with_keeper(
        &self,
        instructions: Vec<Instruction>,
    ) -> KeeperResult<InstructionOutcome> {
        let mut attempt = 0;
        loop {
            match self.try_instructions(&instructions, attempt > 0).await {
                Ok(outcome) => return Ok(outcome),
                Err(TryError::Transient(err)) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        return Err(err);
                    }
                    let delay = self.config.backoff_for_attempt(attempt - 1);
                    debug!(attempt, ?delay, "retrying keeper-signed submission after transient failure");
                    tokio::time::sleep(delay).await;
                }
                Err(TryError::Fatal(err)) => return Err(err),
                Err(TryError::Benign(logs)) => return Ok(InstructionOutcome::BenignSkip(logs)),
            }
        }
    }

    async fn try_instructions(
        &self,
        instructions: &[Instruction],
        force_blockhash_refresh: bool,
    ) -> Result<InstructionOutcome, TryError> {
        let blockhash = self
            .fresh_blockhash(force_blockhash_refresh)
            .await
            .map_err(TryError::Transient)?;

        let priority_fee = self.fee_tracker.lock().await.estimate();
        let mut all_instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.config.compute_unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(priority_fee),
        ];
        all_instructions.extend_from_slice(instructions);

        let mut transaction =
            Transaction::new_with_payer(&all_instructions, Some(&self.keypair.pubkey()));
        transaction.message.recent_blockhash = blockhash;

        let sim_config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };
        let simulation = self
            .rpc
            .simulate_transaction_with_config(&transaction, sim_config)
            .await
            .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

        if let Some(err) = simulation.value.err {
            let logs = simulation.value.logs.unwrap_or_default();
            if logs.iter().any(|l| is_benign_log(l)) {
                return Err(TryError::Benign(logs));
            }
            let keeper_err = KeeperError::SimulationFailed(err.to_string());
            return Err(classify_simulation_error(keeper_err, &logs));
        }

        transaction.sign(&[self.keypair.as_ref()], blockhash);

        let signature = self
            .rpc
            .send_transaction_with_config(
                &transaction,
                solana_client::rpc_config::RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(&[signature])
                .await
                .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

            if let Some(Some(status)) = statuses.value.first().cloned() {
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    if let Some(err) = status.err {
                        return Err(TryError::Fatal(KeeperError::TransactionFatal(err.to_string())));
                    }
                    info!(%signature, "keeper-signed transaction confirmed");
                    return Ok(InstructionOutcome::Confirmed(signature.to_string()));
                }
            }

            if Instant::now() >= deadline {
                return Err(TryError::Transient(KeeperError::Network(
                    "confirmation window elapsed".into(),
                )));
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    async fn try_once(
        &self,
        intent: &HarvestIntent,
        accounts: &HarvestAccounts,
        signer: &Keypair,
        is_retry: bool,
    ) -> Result<Settlement, TryError> {
        let blockhash = self
            .fresh_blockhash(is_retry)
            .await
            .map_err(TryError::Transient)?;

        let priority_fee = self.fee_tracker.lock().await.estimate();
        let compute_budget_ixs = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.config.compute_unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(priority_fee),
        ];
        let harvest_ix = build_harvest_instruction(accounts, &intent.bins);

        let mut instructions = compute_budget_ixs;
        instructions.push(harvest_ix);

        let mut transaction =
            Transaction::new_with_payer(&instructions, Some(&signer.pubkey()));
        transaction.message.recent_blockhash = blockhash;

        let sim_config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };
        let simulation = self
            .rpc
            .simulate_transaction_with_config(&transaction, sim_config)
            .await
            .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

        if let Some(err) = simulation.value.err {
            let logs = simulation.value.logs.unwrap_or_default();
            if logs.iter().any(|l| is_benign_log(l)) {
                return Err(TryError::Benign(logs));
            }
            let keeper_err = KeeperError::SimulationFailed(err.to_string());
            return Err(classify_simulation_error(keeper_err, &logs));
        }

        transaction.sign(&[signer], blockhash);

        let signature = self
            .rpc
            .send_transaction_with_config(
                &transaction,
                solana_client::rpc_config::RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(&[signature])
                .await
                .map_err(|e| TryError::Transient(KeeperError::Network(e.to_string())))?;

            if let Some(Some(status)) = statuses.value.first().cloned() {
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    if let Some(err) = status.err {
                        return Err(TryError::Fatal(KeeperError::TransactionFatal(err.to_string())));
                    }
                    info!(intent_id = intent.intent_id, %signature, "harvest confirmed");
                    return Ok(Settlement {
                        intent_id: intent.intent_id,
                        outcome: Outcome::Success,
                        signature: Some(signature.to_string()),
                        logs: vec![],
                    });
                }
            }

            if Instant::now() >= deadline {
                return Err(TryError::Transient(KeeperError::Network(
                    "confirmation window elapsed".into(),
                )));
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }
}

enum TryError {
    Transient(KeeperError),
    Fatal(KeeperError),
    Benign(Vec<String>),
}

/// Terminal outcome of a keeper-signed, non-harvest submission (§4.H).
#[derive(Debug, Clone)]
pub enum InstructionOutcome {
    Confirmed(String),
    BenignSkip(Vec<String>),
}

/// Simulation log substrings that name a constraint violation or an
/// insufficient-funds condition (§4.E "Fatal (non-retryable) failures").
const FATAL_SIMULATION_MARKERS: &[&str] = &[
    "insufficient",
    "ConstraintViolation",
    "custom program error: 0x1", // InsufficientFunds in the SPL token program
];

fn classify_simulation_error(err: KeeperError, logs: &[String]) -> TryError {
    if logs
        .iter()
        .any(|l| FATAL_SIMULATION_MARKERS.iter().any(|m| l.contains(m)))
    {
        return TryError::Fatal(err);
    }
    match err.classify(logs) {
        keeper_types::ErrorClass::Benign => TryError::Benign(logs.to_vec()),
        keeper_types::ErrorClass::Transient => TryError::Transient(err),
        keeper_types::ErrorClass::Fatal | keeper_types::ErrorClass::Inconsistent => {
            TryError::Fatal(err)
        }
    }
}
