//! Transaction builder tests against the scripted RPC

#[cfg(test)]
mod builder_tests {
    use solana_sdk::{
        commitment_config::CommitmentConfig,
        compute_budget::{self, ComputeBudgetInstruction},
        message::VersionedMessage,
        signature::Keypair,
        signer::Signer,
    };

    use crate::program::{quote_sol_for_usd_ix, DEFAULT_FEED, QUOTE_PROGRAM_ID};
    use crate::rpc::SubmitConfig;
    use crate::test_utils::{MockRpc, RpcCall};
    use crate::tx_builder::{
        builder::build_for_signer, instructions::MAX_COMPUTE_UNIT_LIMIT, FeePolicy, QuoteError,
        TxBuilder,
    };

    fn builder(rpc: &MockRpc, policy: FeePolicy) -> TxBuilder<'_, MockRpc> {
        TxBuilder::new(rpc, policy, CommitmentConfig::confirmed(), SubmitConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_build_scales_probe_units() {
        let rpc = MockRpc::new();
        let payer = Keypair::new();
        let ix = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &payer.pubkey(), 100).unwrap();

        let built = build_for_signer(&builder(&rpc, FeePolicy::default()), &[ix.clone()], &payer)
            .await
            .unwrap();

        // 9_500 * 1.3
        assert_eq!(built.cu_limit, 12_350);
        assert_eq!(built.last_valid_block_height, rpc.last_valid_block_height);

        let VersionedMessage::V0(message) = &built.tx.message else {
            panic!("Expected V0 message");
        };
        assert_eq!(message.recent_blockhash, built.blockhash);
        assert_eq!(message.account_keys[0], payer.pubkey());
        assert_eq!(message.instructions.len(), 3);

        let keys = &message.account_keys;
        let program_of = |i: usize| keys[message.instructions[i].program_id_index as usize];
        assert_eq!(program_of(0), compute_budget::id());
        assert_eq!(program_of(1), compute_budget::id());
        assert_eq!(program_of(2), QUOTE_PROGRAM_ID);
        assert_eq!(
            message.instructions[0].data,
            ComputeBudgetInstruction::set_compute_unit_price(200_000).data
        );
        assert_eq!(
            message.instructions[1].data,
            ComputeBudgetInstruction::set_compute_unit_limit(12_350).data
        );
        assert_eq!(message.instructions[2].data, ix.data);

        // Signed by the payer
        assert_eq!(built.tx.signatures.len(), 1);
        assert!(built.tx.verify_with_results().iter().all(|ok| *ok));
    }

    #[tokio::test]
    async fn test_build_probes_once_per_transaction() {
        let rpc = MockRpc::new();
        let payer = Keypair::new();
        let ix = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &payer.pubkey(), 500).unwrap();

        build_for_signer(&builder(&rpc, FeePolicy::default()), &[ix], &payer)
            .await
            .unwrap();

        assert_eq!(
            rpc.calls(),
            vec![
                RpcCall::LatestBlockhash,
                RpcCall::Simulate {
                    probe: true,
                    usd_cents: Some(500)
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_build_falls_back_to_max_limit() {
        let mut rpc = MockRpc::new();
        rpc.units_consumed = None;
        let payer = Keypair::new();
        let ix = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &payer.pubkey(), 100).unwrap();

        let built = build_for_signer(&builder(&rpc, FeePolicy::default()), &[ix], &payer)
            .await
            .unwrap();
        assert_eq!(built.cu_limit, MAX_COMPUTE_UNIT_LIMIT);
    }

    #[tokio::test]
    async fn test_plain_policy_keeps_simulated_units() {
        let rpc = MockRpc::new();
        let payer = Keypair::new();
        let ix = quote_sol_for_usd_ix(&QUOTE_PROGRAM_ID, &DEFAULT_FEED, &payer.pubkey(), 100).unwrap();

        let built = build_for_signer(&builder(&rpc, FeePolicy::plain()), &[ix], &payer)
            .await
            .unwrap();
        assert_eq!(built.cu_limit, 9_500);
    }

    #[tokio::test]
    async fn test_build_rejects_empty_instruction_list() {
        let rpc = MockRpc::new();
        let payer = Keypair::new();

        let err = build_for_signer(&builder(&rpc, FeePolicy::default()), &[], &payer)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_bad_multiplier() {
        let rpc = MockRpc::new();
        let policy = FeePolicy {
            compute_unit_price: 1,
            compute_unit_limit_multiple: 0.0,
        };
        let result = TxBuilder::new(&rpc, policy, CommitmentConfig::confirmed(), SubmitConfig::default());
        assert!(matches!(result, Err(QuoteError::Configuration(_))));
    }
}
