//! Property tests for block numbering and settlement reconciliation.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sharecoin_sim::store::Trial;
use sharecoin_sim::{MinerState, Plan, ProbabilityTable};
use sharecoin_tests::helpers::*;

/// One step of an interleaved schedule.
#[derive(Debug, Clone)]
enum Step {
    Discover { who: u8 },
    Resync { confirmed: u64 },
    Acknowledge { who: u8 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (0u8..4).prop_map(|who| Step::Discover { who }),
        1 => (0u64..400).prop_map(|confirmed| Step::Resync { confirmed }),
        1 => (0u8..4).prop_map(|who| Step::Acknowledge { who }),
    ]
}

proptest! {
    /// Block numbers handed out across any interleaving of users, resyncs,
    /// and acknowledgements are strictly increasing and never repeat.
    #[test]
    fn block_numbers_strictly_increase(
        seed in 0u64..200,
        probability in 0.1f64..=1.0,
        steps in prop::collection::vec(step(), 1..200),
    ) {
        let mut state = MinerState::new(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let table = ProbabilityTable::fixed(probability);
        for who in 0..4 {
            state.activate(&user(who), Plan::Basic);
        }

        let mut issued: Vec<u64> = Vec::new();
        for (i, s) in steps.iter().enumerate() {
            match s {
                Step::Discover { who } => {
                    if let Trial::Found(block) =
                        state.record_discovery(&user(*who), &mut rng, &table, i as i64)
                    {
                        issued.push(block.block_number);
                    }
                }
                Step::Resync { confirmed } => {
                    state.resync_counter(*confirmed);
                }
                Step::Acknowledge { who } => {
                    let pending: Vec<u64> = state
                        .session(&user(*who))
                        .map(|s| s.pending_blocks.iter().map(|b| b.block_number).collect())
                        .unwrap_or_default();
                    state.remove_blocks(&user(*who), &pending);
                }
            }
        }

        prop_assert!(issued.windows(2).all(|w| w[0] < w[1]), "not increasing: {:?}", issued);
        let unique: HashSet<u64> = issued.iter().copied().collect();
        prop_assert_eq!(unique.len(), issued.len());
        prop_assert!(issued.iter().all(|n| *n >= seed));
    }

    /// Whatever subset of pending blocks the chain already holds, none of
    /// them appears in a submitted batch, and the fresh ones all do.
    #[test]
    fn consumed_blocks_never_submitted(
        discoveries in 1usize..12,
        consumed_mask in prop::collection::vec(any::<bool>(), 12),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let mut h = Harness::new(0, 1.0);
            let x = h.start_miner(1, 2).await;
            for _ in 0..discoveries {
                h.discovery.tick().await;
            }

            let pending = h.pending_numbers(&x);
            let mut consumed = HashSet::new();
            for (n, is_consumed) in pending.iter().zip(&consumed_mask) {
                if *is_consumed {
                    h.chain.consume(&x, *n);
                    consumed.insert(*n);
                }
            }

            h.settlement.run_once().await;

            let submitted: Vec<u64> = h
                .chain
                .batches()
                .into_iter()
                .flat_map(|b| b.block_numbers)
                .collect();
            let expected: Vec<u64> = pending
                .iter()
                .copied()
                .filter(|n| !consumed.contains(n))
                .collect();

            assert!(submitted.iter().all(|n| !consumed.contains(n)));
            assert_eq!(submitted, expected);
            assert!(h.pending_numbers(&x).is_empty());
        });
    }
}
