//! Property tests for file chunking

use bytes::Bytes;
use ledger_bridge::keys::{KeyEncoding, OperatorKey};
use ledger_bridge::memory::{InMemoryConnector, InMemoryNetwork};
use ledger_bridge::record::chunk_payload;
use ledger_bridge::{LedgerConfig, LedgerContext, Operation, FILE_CHUNK_SIZE};
use proptest::prelude::*;
use std::sync::Arc;

proptest! {
    #[test]
    fn chunks_reassemble_to_payload(payload in proptest::collection::vec(any::<u8>(), 0..20_000)) {
        let bytes = Bytes::from(payload.clone());
        let chunks = chunk_payload(&bytes);

        let expected = payload.len().div_ceil(FILE_CHUNK_SIZE).max(1);
        prop_assert_eq!(chunks.len(), expected);
        prop_assert!(chunks.iter().all(|c| c.len() <= FILE_CHUNK_SIZE));
        // Every chunk but the last is full
        prop_assert!(chunks[..chunks.len() - 1].iter().all(|c| c.len() == FILE_CHUNK_SIZE));

        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        prop_assert_eq!(joined, payload);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn stored_bytes_read_back_identically(len in 0usize..13_000) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();

        let (stored, creates, appends) = runtime.block_on(async {
            let connector = InMemoryConnector::new(InMemoryNetwork::new());
            let config = LedgerConfig {
                operator_id: Some("0.0.2".to_string()),
                operator_key: Some(OperatorKey::from_seed(&[4u8; 32], KeyEncoding::Der).to_der_hex()),
                ..LedgerConfig::default()
            };
            let ctx = LedgerContext::new(config, Arc::new(connector.clone())).unwrap();

            let file = ctx.records().store_bytes(Bytes::from(payload.clone())).await.unwrap();
            let stored = ctx.records().fetch_bytes(file).await.unwrap();
            (
                stored,
                connector.network().calls(Operation::CreateFile),
                connector.network().calls(Operation::AppendFile),
            )
        });

        prop_assert_eq!(stored.as_ref(), payload.as_slice());
        prop_assert_eq!(creates, 1);
        prop_assert_eq!(appends as usize, len.div_ceil(FILE_CHUNK_SIZE).max(1) - 1);
    }
}
