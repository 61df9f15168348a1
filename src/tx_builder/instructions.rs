//! Instruction planning for quote transactions
//!
//! Every transaction the driver sends has the same shape:
//! 1. `set_compute_unit_price` (priority fee, micro-lamports per CU)
//! 2. `set_compute_unit_limit`
//! 3. the program instruction(s)
//!
//! The limit is derived from a probe simulation, so planning happens twice
//! per transaction: once with [`MAX_COMPUTE_UNIT_LIMIT`] and once with the
//! scaled limit.

use crate::tx_builder::errors::QuoteError;
use solana_sdk::{compute_budget::ComputeBudgetInstruction, instruction::Instruction};

/// Largest compute-unit limit a transaction may request.
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Ordered list of instructions for one transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    /// The ordered list of instructions for the transaction
    pub instructions: Vec<Instruction>,

    /// Compute-unit limit carried by the plan
    pub cu_limit: u32,
}

/// Plan the instruction list for a quote transaction.
///
/// `cu_price` of zero still emits the price instruction, matching what the
/// network sees from the usual v0 helpers.
///
/// # Errors
///
/// Returns `QuoteError::Configuration` if `program_ixs` is empty or the
/// limit is outside `1..=MAX_COMPUTE_UNIT_LIMIT`.
pub fn plan_quote_instructions(
    cu_price: u64,
    cu_limit: u32,
    program_ixs: &[Instruction],
) -> Result<InstructionPlan, QuoteError> {
    if program_ixs.is_empty() {
        return Err(QuoteError::configuration(
            "Transaction needs at least one program instruction",
        ));
    }
    if cu_limit == 0 || cu_limit > MAX_COMPUTE_UNIT_LIMIT {
        return Err(QuoteError::configuration(format!(
            "Compute unit limit {} outside 1..={}",
            cu_limit, MAX_COMPUTE_UNIT_LIMIT
        )));
    }

    let mut instructions = Vec::with_capacity(2 + program_ixs.len());
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(cu_price));
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(cu_limit));
    instructions.extend_from_slice(program_ixs);

    Ok(InstructionPlan {
        instructions,
        cu_limit,
    })
}

/// Scale simulated compute usage by `multiplier`.
///
/// Result is `floor(units * multiplier)` clamped to
/// `1..=MAX_COMPUTE_UNIT_LIMIT`. When the probe reported no usage the
/// maximum is used.
pub fn scaled_compute_unit_limit(units_consumed: Option<u64>, multiplier: f64) -> u32 {
    match units_consumed {
        Some(units) => {
            let scaled = (units as f64 * multiplier).floor();
            if scaled >= MAX_COMPUTE_UNIT_LIMIT as f64 {
                MAX_COMPUTE_UNIT_LIMIT
            } else if scaled < 1.0 {
                1
            } else {
                scaled as u32
            }
        }
        None => MAX_COMPUTE_UNIT_LIMIT,
    }
}

/// Check a multiplier is usable for [`scaled_compute_unit_limit`].
pub fn validate_multiplier(multiplier: f64) -> Result<(), QuoteError> {
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(QuoteError::configuration(format!(
            "Compute unit limit multiplier must be finite and >= 1.0, got {}",
            multiplier
        )));
    }
    Ok(())
}
