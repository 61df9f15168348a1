//! Shared fixtures for the in-crate tests

#[cfg(test)]
pub mod test_helpers {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair};
    use tracing::subscriber::DefaultGuard;

    use crate::driver::DriverSettings;
    use crate::program::{DEFAULT_FEED, QUOTE_PROGRAM_ID};
    use crate::rpc::SubmitConfig;
    use crate::tx_builder::FeePolicy;
    use crate::wallet::WalletManager;

    /// The five amounts of the standard run, in cents
    pub const FIXED_AMOUNTS: [u64; 5] = [100, 500, 1000, 5000, 10000];

    pub fn test_wallet() -> WalletManager {
        WalletManager::from_keypair(Keypair::new())
    }

    /// Default run settings with a fast confirmation poll
    pub fn test_settings() -> DriverSettings {
        DriverSettings {
            program_id: QUOTE_PROGRAM_ID,
            feed: DEFAULT_FEED,
            policy: FeePolicy::default(),
            commitment: CommitmentConfig::confirmed(),
            submit: SubmitConfig::default(),
            confirm_poll_interval: Duration::from_millis(1),
        }
    }

    /// Log sink for asserting on the lines the driver emits
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Route this thread's tracing output into the sink until the guard drops
        pub fn install(&self) -> DefaultGuard {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
