//! Quote transaction pipeline
//!
//! - **errors**: error taxonomy shared by every stage
//! - **instructions**: compute-budget planning and limit scaling
//! - **builder**: blockhash fetch, probe simulation, v0 compile and sign
//! - **simulate**: program-log inspection of simulation results
//! - **confirm**: blockhash-bounded confirmation polling
//!
//! Every transaction carries a priority fee, a compute limit derived from
//! a probe simulation, and the program instruction(s), in that order.

pub mod errors;
pub use errors::QuoteError;

pub mod builder;
pub mod confirm;
pub mod instructions;
pub mod simulate;

pub use builder::{BuiltTx, FeePolicy, TxBuilder};
pub use confirm::confirm_signature;
pub use instructions::{plan_quote_instructions, scaled_compute_unit_limit, InstructionPlan};
pub use simulate::{scan_simulation_logs, QuoteLine, SimulationReport};
