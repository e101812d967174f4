//! Instruction builders for the wrapper program (§4.A, §4.E, §4.H, §4.I).
//! Each builder accepts a small struct of accounts/args and returns an
//! `Instruction` ready to append to a transaction; callers own compute-budget
//! and blockhash concerns.
use anchor_lang::solana_program::hash::hash;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;

fn discriminator(name: &str) -> [u8; 8] {
    let digest = hash(format!("global:{name}").as_bytes()).to_bytes();
    digest[..8].try_into().unwrap()
}

/// Accounts common to every bin-crossing instruction: the position PDA, its
/// owning pool, and the bin-array account(s) that cover the requested range.
/// `payer` is whoever submits the transaction (keeper key for the ordinary
/// path, any caller for the crank path, §4.I) — rewards settle to the
/// position's stored owner, not to `payer`, so harvesting never needs the
/// position owner's signature.
pub struct HarvestAccounts {
    pub program_id: Pubkey,
    pub position: Pubkey,
    pub pool: Pubkey,
    pub payer: Pubkey,
    pub bin_arrays: Vec<Pubkey>,
    /// Resolved via `dlmm_protocol::pda::resolve_bitmap_extension`: the
    /// derived bitmap PDA when the pool has one, else the DLMM program id
    /// itself as a read-only placeholder (§6).
    pub bitmap_extension: Pubkey,
    pub bitmap_extension_exists: bool,
    pub event_authority: Pubkey,
}

/// Build a `harvest` instruction for the given bin ids (§4.E). The bin-array
/// accounts must already cover every index in `bins`; the caller (scheduler)
/// resolves them via `dlmm_protocol::pda::derive_bin_array_pda`.
pub fn build_harvest_instruction(accounts: &HarvestAccounts, bins: &[i32]) -> Instruction {
    let mut keys = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new_readonly(accounts.pool, false),
        AccountMeta::new(accounts.payer, true),
    ];
    for bin_array in &accounts.bin_arrays {
        keys.push(AccountMeta::new(*bin_array, false));
    }
    keys.push(if accounts.bitmap_extension_exists {
        AccountMeta::new(accounts.bitmap_extension, false)
    } else {
        AccountMeta::new_readonly(accounts.bitmap_extension, false)
    });
    keys.push(AccountMeta::new_readonly(accounts.event_authority, false));
    keys.push(AccountMeta::new_readonly(accounts.program_id, false));

    let mut data = discriminator("harvest").to_vec();
    data.extend_from_slice(&(bins.len() as u32).to_le_bytes());
    for bin in bins {
        data.extend_from_slice(&bin.to_le_bytes());
    }

    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data,
    }
}

/// Accounts for opening a wrapper position (§4.H fee-rover step).
pub struct OpenPositionAccounts {
    pub program_id: Pubkey,
    pub position: Pubkey,
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub position_mint: Pubkey,
    pub metadata_account: Pubkey,
    pub vault: Pubkey,
    pub event_authority: Pubkey,
}

pub struct OpenPositionArgs {
    pub side_flag: u8,
    pub min_bin: i32,
    pub max_bin: i32,
    pub deposit_amount: u64,
}

pub fn build_open_position_with_metadata_instruction(
    accounts: &OpenPositionAccounts,
    args: &OpenPositionArgs,
) -> Instruction {
    let keys = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new_readonly(accounts.pool, false),
        AccountMeta::new(accounts.owner, true),
        AccountMeta::new(accounts.position_mint, true),
        AccountMeta::new(accounts.metadata_account, false),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new_readonly(accounts.event_authority, false),
        AccountMeta::new_readonly(accounts.program_id, false),
    ];

    let mut data = discriminator("open_position_with_metadata").to_vec();
    data.push(args.side_flag);
    data.extend_from_slice(&args.min_bin.to_le_bytes());
    data.extend_from_slice(&args.max_bin.to_le_bytes());
    data.extend_from_slice(&args.deposit_amount.to_le_bytes());

    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data,
    }
}

/// Accounts for closing a wrapper position (§4.H cleanup step).
pub struct ClosePositionAccounts {
    pub program_id: Pubkey,
    pub position: Pubkey,
    pub owner: Pubkey,
    pub position_mint: Pubkey,
    pub metadata_account: Pubkey,
    pub vault: Pubkey,
    pub event_authority: Pubkey,
}

pub fn build_close_position_with_metadata_instruction(
    accounts: &ClosePositionAccounts,
) -> Instruction {
    let keys = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new(accounts.owner, true),
        AccountMeta::new(accounts.position_mint, true),
        AccountMeta::new(accounts.metadata_account, false),
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new_readonly(accounts.event_authority, false),
        AccountMeta::new_readonly(accounts.program_id, false),
    ];

    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data: discriminator("close_position_with_metadata").to_vec(),
    }
}

/// Accounts for the Saturday Keeper's `unwrap` step (§4.H): unwrap fee-rover
/// receipts into the distribution pool.
pub struct UnwrapAccounts {
    pub program_id: Pubkey,
    pub dist_pool: Pubkey,
    pub monke_state: Pubkey,
    pub authority: Pubkey,
}

pub fn build_unwrap_instruction(accounts: &UnwrapAccounts) -> Instruction {
    let keys = vec![
        AccountMeta::new(accounts.dist_pool, false),
        AccountMeta::new(accounts.monke_state, false),
        AccountMeta::new(accounts.authority, true),
        AccountMeta::new_readonly(accounts.program_id, false),
    ];
    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data: discriminator("unwrap").to_vec(),
    }
}

/// Accounts for the Saturday Keeper's `sweep` step: collect crossed-bin
/// proceeds from every fee-rover position into the program vault.
pub struct SweepAccounts {
    pub program_id: Pubkey,
    pub program_vault: Pubkey,
    pub rover_authority: Pubkey,
    pub authority: Pubkey,
}

pub fn build_sweep_instruction(accounts: &SweepAccounts) -> Instruction {
    let keys = vec![
        AccountMeta::new(accounts.program_vault, false),
        AccountMeta::new_readonly(accounts.rover_authority, false),
        AccountMeta::new(accounts.authority, true),
        AccountMeta::new_readonly(accounts.program_id, false),
    ];
    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data: discriminator("sweep").to_vec(),
    }
}

/// Accounts for the Saturday Keeper's `deposit_sol` step: move distribution-pool
/// SOL into the program vault and advance `accumulated_sol_per_share`.
pub struct DepositSolAccounts {
    pub program_id: Pubkey,
    pub dist_pool: Pubkey,
    pub program_vault: Pubkey,
    pub monke_state: Pubkey,
    pub authority: Pubkey,
}

pub fn build_deposit_sol_instruction(accounts: &DepositSolAccounts, lamports: u64) -> Instruction {
    let keys = vec![
        AccountMeta::new(accounts.dist_pool, false),
        AccountMeta::new(accounts.program_vault, false),
        AccountMeta::new(accounts.monke_state, false),
        AccountMeta::new(accounts.authority, true),
        AccountMeta::new_readonly(accounts.program_id, false),
    ];
    let mut data = discriminator("deposit_sol").to_vec();
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data,
    }
}

/// Permissionless crank instruction (§4.I): any payer may submit, rewards
/// accrue to the position owner, not the caller.
pub struct CrankAccounts {
    pub program_id: Pubkey,
    pub position: Pubkey,
    pub pool: Pubkey,
    pub payer: Pubkey,
    pub bin_arrays: Vec<Pubkey>,
    pub bitmap_extension: Pubkey,
    pub bitmap_extension_exists: bool,
    pub event_authority: Pubkey,
}

pub fn build_crank_instruction(accounts: &CrankAccounts, bins: &[i32]) -> Instruction {
    let mut keys = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new_readonly(accounts.pool, false),
        AccountMeta::new(accounts.payer, true),
    ];
    for bin_array in &accounts.bin_arrays {
        keys.push(AccountMeta::new(*bin_array, false));
    }
    keys.push(if accounts.bitmap_extension_exists {
        AccountMeta::new(accounts.bitmap_extension, false)
    } else {
        AccountMeta::new_readonly(accounts.bitmap_extension, false)
    });
    keys.push(AccountMeta::new_readonly(accounts.event_authority, false));
    keys.push(AccountMeta::new_readonly(accounts.program_id, false));

    let mut data = discriminator("crank_harvest").to_vec();
    data.extend_from_slice(&(bins.len() as u32).to_le_bytes());
    for bin in bins {
        data.extend_from_slice(&bin.to_le_bytes());
    }

    Instruction {
        program_id: accounts.program_id,
        accounts: keys,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminator_matches_known_anchor_name() {
        // sha256("global:harvest")[..8], computed independently to pin the helper.
        let expected = hash(b"global:harvest").to_bytes()[..8].to_vec();
        assert_eq!(discriminator("harvest").to_vec(), expected);
    }

    #[test]
    fn harvest_instruction_encodes_bin_count_and_ids() {
        let accounts = HarvestAccounts {
            program_id: Pubkey::new_unique(),
            position: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            bin_arrays: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            bitmap_extension: Pubkey::new_unique(),
            bitmap_extension_exists: true,
            event_authority: Pubkey::new_unique(),
        };
        let bins = vec![114, 113, 112];
        let ix = build_harvest_instruction(&accounts, &bins);

        assert_eq!(&ix.data[..8], &discriminator("harvest"));
        let count = u32::from_le_bytes(ix.data[8..12].try_into().unwrap());
        assert_eq!(count, 3);
        assert_eq!(ix.accounts.len(), 3 + accounts.bin_arrays.len() + 3);
    }

    #[test]
    fn bitmap_extension_is_writable_when_present_and_readonly_placeholder_when_absent() {
        let program_id = Pubkey::new_unique();
        let bitmap_pda = Pubkey::new_unique();
        let present = HarvestAccounts {
            program_id,
            position: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            bin_arrays: vec![Pubkey::new_unique()],
            bitmap_extension: bitmap_pda,
            bitmap_extension_exists: true,
            event_authority: Pubkey::new_unique(),
        };
        let ix = build_harvest_instruction(&present, &[1]);
        let bitmap_meta = &ix.accounts[3 + present.bin_arrays.len()];
        assert_eq!(bitmap_meta.pubkey, bitmap_pda);
        assert!(bitmap_meta.is_writable);

        let absent = HarvestAccounts {
            bitmap_extension: program_id,
            bitmap_extension_exists: false,
            ..present
        };
        let ix = build_harvest_instruction(&absent, &[1]);
        let bitmap_meta = &ix.accounts[3 + absent.bin_arrays.len()];
        assert_eq!(bitmap_meta.pubkey, program_id);
        assert!(!bitmap_meta.is_writable);
    }

    #[test]
    fn deposit_sol_instruction_encodes_lamports() {
        let accounts = DepositSolAccounts {
            program_id: Pubkey::new_unique(),
            dist_pool: Pubkey::new_unique(),
            program_vault: Pubkey::new_unique(),
            monke_state: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
        };
        let ix = build_deposit_sol_instruction(&accounts, 1_500_000);
        assert_eq!(&ix.data[..8], &discriminator("deposit_sol"));
        let lamports = u64::from_le_bytes(ix.data[8..16].try_into().unwrap());
        assert_eq!(lamports, 1_500_000);
        assert!(ix.accounts[3].is_signer);
    }

    #[test]
    fn payer_signs_harvest_but_bin_arrays_do_not() {
        let accounts = HarvestAccounts {
            program_id: Pubkey::new_unique(),
            position: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            bin_arrays: vec![Pubkey::new_unique()],
            bitmap_extension: Pubkey::new_unique(),
            bitmap_extension_exists: true,
            event_authority: Pubkey::new_unique(),
        };
        let ix = build_harvest_instruction(&accounts, &[1]);
        assert!(ix.accounts[2].is_signer);
        assert!(!ix.accounts[3].is_signer);
    }
}
