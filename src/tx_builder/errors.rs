//! Error types for quote transaction building and submission
//!
//! Every failure inside one quote iteration is expressed as a
//! [`QuoteError`]. The driver records it against the amount being quoted
//! and moves on to the next amount, so errors carry enough context to be
//! logged on their own.

use solana_client::client_error::ClientError;
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Error type for building, simulating, submitting and confirming a
/// quote transaction.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// Failed to build the program instruction
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program the instruction targets
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// The node rejected or could not run a simulation
    ///
    /// A simulation that runs but reports a program error is not this
    /// variant; that outcome is logged and the transaction still goes out.
    #[error("Simulation failed: {0}")]
    Simulation(String),

    /// Failed to sign or compile the transaction message
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid builder or driver configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// RPC client error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The submitted transaction landed with an error
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed {
        signature: Signature,
        reason: String,
    },

    /// The blockhash expired before the signature reached the commitment
    #[error("Transaction {signature} expired: block height {current} exceeded last valid {last_valid}")]
    BlockheightExceeded {
        signature: Signature,
        current: u64,
        last_valid: u64,
    },

    /// Wrapped error from external crates
    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl QuoteError {
    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InstructionBuild { .. } => "instruction",
            Self::Simulation(_) => "simulation",
            Self::Signing(_) => "signing",
            Self::Configuration(_) => "config",
            Self::Rpc(_) => "rpc",
            Self::TransactionFailed { .. } => "transaction",
            Self::BlockheightExceeded { .. } => "expired",
            Self::External(_) => "external",
        }
    }

    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a simulation failure error
    pub fn simulation_failed(reason: impl Into<String>) -> Self {
        Self::Simulation(reason.into())
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

impl From<ClientError> for QuoteError {
    fn from(err: ClientError) -> Self {
        Self::Rpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuoteError::InstructionBuild {
            program: "sb_on_demand_solana".to_string(),
            reason: "zero amount".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Instruction build error (program=sb_on_demand_solana): zero amount"
        );

        let err = QuoteError::BlockheightExceeded {
            signature: Signature::default(),
            current: 120,
            last_valid: 100,
        };
        assert!(err.to_string().contains("block height 120 exceeded last valid 100"));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(QuoteError::Rpc("x".to_string()).category(), "rpc");
        assert_eq!(QuoteError::simulation_failed("x").category(), "simulation");
        assert_eq!(QuoteError::configuration("x").category(), "config");
        assert_eq!(
            QuoteError::TransactionFailed {
                signature: Signature::default(),
                reason: "custom program error: 0x1771".to_string(),
            }
            .category(),
            "transaction"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: QuoteError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, QuoteError::External(_)));
        assert_eq!(err.to_string(), "External error: boom");
    }
}
