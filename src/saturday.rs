//! Saturday Keeper: the weekly fee pipeline (§4.H), modeled as an explicit
//! resumable state machine (`Unwrap -> Sweep -> OpenFeeRovers -> Deposit ->
//! Cleanup -> Done`) so a process restart mid-run picks up at the last
//! incomplete step instead of restarting the whole sequence (§5
//! Cancellation). Benign skips ("NothingToSweep", "NoMonkes") are logged and
//! the sequence continues; a fatal error halts the run on its current step.
use dlmm_protocol::instructions::{
    build_close_position_with_metadata_instruction, build_deposit_sol_instruction,
    build_open_position_with_metadata_instruction, build_sweep_instruction,
    build_unwrap_instruction, ClosePositionAccounts, DepositSolAccounts, OpenPositionAccounts,
    OpenPositionArgs, SweepAccounts, UnwrapAccounts,
};
use dlmm_protocol::pda::{
    derive_dist_pool_pda, derive_event_authority_pda, derive_metadata_pda, derive_monke_state_pda,
    derive_position_pda, derive_program_vault_pda, derive_rover_authority_pda, derive_vault_pda,
    fee_rover_width,
};
use event_bus::EventBus;
use keeper_types::{Event, KeeperResult};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use tracing::{info, warn};
use tx_executor::{Executor, InstructionOutcome};

/// Standard Metaplex Token Metadata program id, needed to derive each
/// fee-rover position's metadata account (§6 "metadata account").
const METAPLEX_TOKEN_METADATA_PROGRAM: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

fn metaplex_program_id() -> Pubkey {
    METAPLEX_TOKEN_METADATA_PROGRAM
        .parse()
        .expect("hardcoded metaplex program id is valid")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturdayStep {
    Unwrap,
    Sweep,
    OpenFeeRovers,
    Deposit,
    Cleanup,
    Done,
}

/// One pool the Saturday Keeper recycles non-SOL fees into via a fresh
/// fee-rover position (§4.H step 3).
#[derive(Debug, Clone)]
pub struct FeeRoverTarget {
    pub pool: Pubkey,
    pub bin_step: u16,
    pub active_bin_id: i32,
    pub side_flag: u8,
    pub deposit_amount: u64,
}

pub struct SaturdayKeeperConfig {
    pub core_program_id: Pubkey,
    pub fee_rover_targets: Vec<FeeRoverTarget>,
    /// Lamports to move from the distribution pool this cycle (§4.H step 4).
    pub deposit_lamports: u64,
    /// Fee-rover positions opened by a previous cycle that are due for
    /// cleanup this run (§4.H step 5); the caller resolves these from the
    /// Position Registry by owner == keeper authority.
    pub positions_to_close: Vec<Pubkey>,
    pub event_bus: Arc<EventBus>,
}

/// Drives the fee pipeline to completion, one step at a time, persisting
/// only in memory for the lifetime of the process — a restart re-enters at
/// [`SaturdayStep::Unwrap`], which is safe since every step here is either
/// idempotent on-chain or benign-skips cleanly when there's nothing to do.
pub struct SaturdayKeeper {
    step: SaturdayStep,
    config: SaturdayKeeperConfig,
    authority: Pubkey,
}

impl SaturdayKeeper {
    pub fn new(config: SaturdayKeeperConfig, authority: Pubkey) -> Self {
        Self {
            step: SaturdayStep::Unwrap,
            config,
            authority,
        }
    }

    pub fn current_step(&self) -> SaturdayStep {
        self.step
    }

    /// Run the sequence to completion, halting (and leaving `self.step` in
    /// place for a later retry) the moment a step reports a fatal error.
    pub async fn run(&mut self, executor: &Executor) -> KeeperResult<()> {
        loop {
            match self.step {
                SaturdayStep::Unwrap => self.run_unwrap(executor).await?,
                SaturdayStep::Sweep => self.run_sweep(executor).await?,
                SaturdayStep::OpenFeeRovers => self.run_open_fee_rovers(executor).await?,
                SaturdayStep::Deposit => self.run_deposit(executor).await?,
                SaturdayStep::Cleanup => self.run_cleanup(executor).await?,
                SaturdayStep::Done => {
                    info!("saturday keeper cycle complete");
                    return Ok(());
                }
            }
        }
    }

    async fn submit(&self, executor: &Executor, instructions: Vec<solana_program::instruction::Instruction>, step: &str) -> KeeperResult<()> {
        match executor.submit_with_keeper(instructions).await {
            Ok(InstructionOutcome::Confirmed(signature)) => {
                info!(step, %signature, "saturday step confirmed");
                Ok(())
            }
            Ok(InstructionOutcome::BenignSkip(logs)) => {
                info!(step, ?logs, "saturday step benign-skipped");
                Ok(())
            }
            Err(err) => {
                warn!(step, %err, "saturday step failed, halting for resume");
                Err(err)
            }
        }
    }

    async fn run_unwrap(&mut self, executor: &Executor) -> KeeperResult<()> {
        let program_id = self.config.core_program_id;
        let (dist_pool, _) = derive_dist_pool_pda(&program_id);
        let (monke_state, _) = derive_monke_state_pda(&program_id);
        let accounts = UnwrapAccounts {
            program_id,
            dist_pool,
            monke_state,
            authority: self.authority,
        };
        let ix = build_unwrap_instruction(&accounts);
        self.submit(executor, vec![ix], "unwrap").await?;
        self.step = SaturdayStep::Sweep;
        Ok(())
    }

    async fn run_sweep(&mut self, executor: &Executor) -> KeeperResult<()> {
        let program_id = self.config.core_program_id;
        let (program_vault, _) = derive_program_vault_pda(&program_id);
        let (rover_authority, _) = derive_rover_authority_pda(&program_id);
        let accounts = SweepAccounts {
            program_id,
            program_vault,
            rover_authority,
            authority: self.authority,
        };
        let ix = build_sweep_instruction(&accounts);
        self.submit(executor, vec![ix], "sweep").await?;
        self.step = SaturdayStep::OpenFeeRovers;
        Ok(())
    }

    async fn run_open_fee_rovers(&mut self, executor: &Executor) -> KeeperResult<()> {
        let program_id = self.config.core_program_id;
        let (event_authority, _) = derive_event_authority_pda(&program_id);
        let metaplex = metaplex_program_id();

        for target in &self.config.fee_rover_targets {
            let width = fee_rover_width(target.bin_step) as i32;
            let (min_bin, max_bin) = match target.side_flag {
                0 => (target.active_bin_id - width, target.active_bin_id - 1), // Sell
                _ => (target.active_bin_id + 1, target.active_bin_id + width), // Buy
            };

            let position_mint = Keypair::new();
            let (position, _) = derive_position_pda(&position_mint.pubkey(), &program_id);
            let (vault, _) = derive_vault_pda(&position_mint.pubkey(), &program_id);
            let (metadata_account, _) = derive_metadata_pda(&metaplex, &position_mint.pubkey());

            let accounts = OpenPositionAccounts {
                program_id,
                position,
                pool: target.pool,
                owner: self.authority,
                position_mint: position_mint.pubkey(),
                metadata_account,
                vault,
                event_authority,
            };
            let args = OpenPositionArgs {
                side_flag: target.side_flag,
                min_bin,
                max_bin,
                deposit_amount: target.deposit_amount,
            };
            let ix = build_open_position_with_metadata_instruction(&accounts, &args);
            self.submit(executor, vec![ix], "open_fee_rover").await?;
            self.config
                .event_bus
                .publish(Event::RoverTvlUpdated {
                    rover: position,
                    lamports: target.deposit_amount,
                })
                .await;
        }

        self.step = SaturdayStep::Deposit;
        Ok(())
    }

    async fn run_deposit(&mut self, executor: &Executor) -> KeeperResult<()> {
        let program_id = self.config.core_program_id;
        let (dist_pool, _) = derive_dist_pool_pda(&program_id);
        let (program_vault, _) = derive_program_vault_pda(&program_id);
        let (monke_state, _) = derive_monke_state_pda(&program_id);
        let accounts = DepositSolAccounts {
            program_id,
            dist_pool,
            program_vault,
            monke_state,
            authority: self.authority,
        };
        let ix = build_deposit_sol_instruction(&accounts, self.config.deposit_lamports);
        self.submit(executor, vec![ix], "deposit_sol").await?;
        self.step = SaturdayStep::Cleanup;
        Ok(())
    }

    async fn run_cleanup(&mut self, executor: &Executor) -> KeeperResult<()> {
        let program_id = self.config.core_program_id;
        let (event_authority, _) = derive_event_authority_pda(&program_id);
        let metaplex = metaplex_program_id();

        for position_mint in self.config.positions_to_close.clone() {
            let (position, _) = derive_position_pda(&position_mint, &program_id);
            let (vault, _) = derive_vault_pda(&position_mint, &program_id);
            let (metadata_account, _) = derive_metadata_pda(&metaplex, &position_mint);

            let accounts = ClosePositionAccounts {
                program_id,
                position,
                owner: self.authority,
                position_mint,
                metadata_account,
                vault,
                event_authority,
            };
            let ix = build_close_position_with_metadata_instruction(&accounts);
            self.submit(executor, vec![ix], "close_fee_rover").await?;
        }

        self.step = SaturdayStep::Done;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SaturdayKeeperConfig {
        SaturdayKeeperConfig {
            core_program_id: Pubkey::new_unique(),
            fee_rover_targets: vec![],
            deposit_lamports: 0,
            positions_to_close: vec![],
            event_bus: Arc::new(EventBus::new(event_bus::EventBusConfig::default())),
        }
    }

    #[test]
    fn new_keeper_starts_at_unwrap() {
        let keeper = SaturdayKeeper::new(config(), Pubkey::new_unique());
        assert_eq!(keeper.current_step(), SaturdayStep::Unwrap);
    }

    #[test]
    fn fee_rover_width_drives_sell_range_below_active_bin() {
        let target = FeeRoverTarget {
            pool: Pubkey::new_unique(),
            bin_step: 100,
            active_bin_id: 200,
            side_flag: 0,
            deposit_amount: 1_000,
        };
        let width = fee_rover_width(target.bin_step) as i32;
        assert_eq!(width, 69);
        let (min_bin, max_bin) = (target.active_bin_id - width, target.active_bin_id - 1);
        assert_eq!((min_bin, max_bin), (131, 199));
    }
}
