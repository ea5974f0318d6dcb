//! End-to-end behaviour of `MultiClient` against in-memory beacon nodes.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use beaconrpc_multi::{
    BlockId, CallContext, Capability, Epoch, Gwei, HealthState, HealthStatus,
    MultiClient, MultiError, ProposerDuty, ProviderError, Root, Slot, StateId, Strategy,
    ValidatorIndex,
};
use beaconrpc_core::{
    AggregateAndProof, Attestation, AttestationData, BlsPubKey, BlsSignature,
    SignedAggregateAndProof,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use common::{init_logging, only, Behaviour, MockNode};

fn aggregate(index: u64) -> SignedAggregateAndProof {
    SignedAggregateAndProof {
        message: AggregateAndProof {
            aggregator_index: ValidatorIndex(index),
            aggregate: Attestation {
                aggregation_bits: vec![0b1],
                data: AttestationData::default(),
                signature: BlsSignature([0u8; 96]),
            },
            selection_proof: BlsSignature([1u8; 96]),
        },
        signature: BlsSignature([2u8; 96]),
    }
}

#[tokio::test(start_paused = true)]
async fn first_success_returns_fastest_and_cancels_the_rest() {
    init_logging();
    let fast = MockNode::new("fast").delay_ms(10).root(1).build();
    let slow = MockNode::new("slow").delay_ms(500).root(2).build();
    let stuck = MockNode::new("stuck").hanging().build();
    let client = MultiClient::builder()
        .provider(slow.clone())
        .provider(fast.clone())
        .provider(stuck.clone())
        .build()
        .unwrap();

    let started = Instant::now();
    let root = client
        .beacon_block_root(&CallContext::new(), &BlockId::Head)
        .await
        .unwrap();
    assert_eq!(root, Some(Root([1u8; 32])));
    assert!(started.elapsed() < Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(slow.abandoned(), 1);
    assert_eq!(stuck.abandoned(), 1);
    // abandoned calls are not failures
    assert_eq!(client.health(), HealthStatus::Healthy);
    assert!(client
        .health_summary()
        .iter()
        .all(|p| p.health.consecutive_failures == 0));
}

#[tokio::test(start_paused = true)]
async fn every_provider_failure_is_reported() {
    init_logging();
    let a = MockNode::new("a")
        .failing(ProviderError::Http("connection refused".into()))
        .build();
    let b = MockNode::new("b")
        .delay_ms(5)
        .failing(ProviderError::Api {
            status: 503,
            message: "syncing".into(),
        })
        .build();
    let c = MockNode::new("c")
        .delay_ms(2)
        .failing(ProviderError::Timeout { ms: 1000 })
        .build();
    let client = MultiClient::builder()
        .provider(a)
        .provider(b)
        .provider(c)
        .build()
        .unwrap();

    let err = client
        .beacon_state_root(&CallContext::new(), &StateId::Finalized)
        .await
        .unwrap_err();
    let MultiError::AllProvidersFailed(report) = &err else {
        panic!("expected all providers to fail, got {err:?}");
    };
    assert_eq!(report.len(), 3);
    let ids: Vec<_> = report.providers().map(|p| p.to_string()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(
        report.error_for("b"),
        Some(&ProviderError::Api {
            status: 503,
            message: "syncing".into()
        })
    );
    assert!(err.is_transient());
    assert!(err.to_string().contains("a: "));
}

#[tokio::test(start_paused = true)]
async fn unanimous_mismatch_names_the_divergent_provider() {
    init_logging();
    let client = MultiClient::builder()
        .provider(MockNode::new("a").delay_ms(5).root(1).build())
        .provider(MockNode::new("b").delay_ms(20).root(1).build())
        .provider(MockNode::new("c").delay_ms(10).root(9).build())
        .build()
        .unwrap();

    let ctx = CallContext::new().with_strategy(Strategy::Unanimous);
    let err = client
        .beacon_block_root(&ctx, &BlockId::Finalized)
        .await
        .unwrap_err();
    let report = err.failures().expect("divergent providers are reported");
    let ids: Vec<_> = report.providers().map(|p| p.to_string()).collect();
    assert_eq!(ids, vec!["c"]);
    assert!(report.error_for("c").unwrap().is_divergence());
    assert!(matches!(err, MultiError::ConsensusMismatch(ref m) if m.agreeing == 2 && m.required == 3));
}

#[tokio::test(start_paused = true)]
async fn majority_outvotes_a_divergent_provider() {
    init_logging();
    let client = MultiClient::builder()
        .default_strategy(Strategy::Majority)
        .provider(MockNode::new("a").delay_ms(30).root(7).build())
        .provider(MockNode::new("b").delay_ms(1).root(8).build())
        .provider(MockNode::new("c").delay_ms(15).root(7).build())
        .build()
        .unwrap();

    let root = client
        .beacon_state_root(&CallContext::new(), &StateId::Head)
        .await
        .unwrap();
    assert_eq!(root, Some(Root([7u8; 32])));
}

#[tokio::test(start_paused = true)]
async fn quorum_counts_only_successful_answers() {
    init_logging();
    let client = MultiClient::builder()
        .provider(MockNode::new("a").root(3).build())
        .provider(
            MockNode::new("b")
                .failing(ProviderError::Http("reset".into()))
                .build(),
        )
        .provider(MockNode::new("c").delay_ms(5).root(3).build())
        .build()
        .unwrap();

    let ctx = CallContext::new().with_strategy(Strategy::Quorum(2));
    let root = client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap();
    assert_eq!(root, Some(Root([3u8; 32])));

    let ctx = CallContext::new().with_strategy(Strategy::Quorum(3));
    let err = client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap_err();
    assert!(matches!(err, MultiError::ConsensusMismatch(_)));
}

#[tokio::test(start_paused = true)]
async fn failing_provider_is_benched_then_probed_after_cooldown() {
    init_logging();
    let flaky = MockNode::new("flaky")
        .delay_ms(1)
        .root(1)
        .failing(ProviderError::Http("refused".into()))
        .build();
    let steady = MockNode::new("steady").delay_ms(5).root(1).build();
    let client = MultiClient::builder()
        .failure_threshold(3)
        .cooldown(Duration::from_secs(30))
        .provider(flaky.clone())
        .provider(steady.clone())
        .build()
        .unwrap();
    let ctx = CallContext::new();

    for _ in 0..3 {
        client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap();
    }
    assert_eq!(flaky.calls(), 3);
    assert_eq!(client.registry().state_of("flaky"), Some(HealthState::Inactive));
    assert_eq!(client.health(), HealthStatus::Degraded);

    client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap();
    assert_eq!(flaky.calls(), 3, "inactive provider must not be called");

    tokio::time::advance(Duration::from_secs(31)).await;
    flaky.set(Behaviour::Answer);
    client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap();
    assert_eq!(flaky.calls(), 4);
    assert_eq!(client.registry().state_of("flaky"), Some(HealthState::Active));
    assert_eq!(client.health(), HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_failure_streak() {
    init_logging();
    let node = MockNode::new("node")
        .root(1)
        .failing(ProviderError::Http("refused".into()))
        .build();
    let client = MultiClient::builder()
        .failure_threshold(3)
        .provider(node.clone())
        .build()
        .unwrap();
    let ctx = CallContext::new();

    for _ in 0..2 {
        assert!(client.beacon_block_root(&ctx, &BlockId::Head).await.is_err());
    }
    node.set(Behaviour::Answer);
    client.beacon_block_root(&ctx, &BlockId::Head).await.unwrap();
    node.set(Behaviour::Fail(ProviderError::Http("refused".into())));
    for _ in 0..2 {
        assert!(client.beacon_block_root(&ctx, &BlockId::Head).await.is_err());
    }

    assert_eq!(client.registry().state_of("node"), Some(HealthState::Active));
    assert_eq!(client.health_summary()[0].health.consecutive_failures, 2);
}

#[tokio::test(start_paused = true)]
async fn all_inactive_reports_capability_unavailable() {
    init_logging();
    let node = MockNode::new("node")
        .failing(ProviderError::Http("refused".into()))
        .build();
    let client = MultiClient::builder()
        .failure_threshold(1)
        .provider(node.clone())
        .build()
        .unwrap();
    let ctx = CallContext::new();

    assert!(client.beacon_state_root(&ctx, &StateId::Head).await.is_err());
    let err = client.beacon_state_root(&ctx, &StateId::Head).await.unwrap_err();
    assert!(matches!(
        err,
        MultiError::CapabilityUnavailable {
            capability: Capability::BeaconStateRoot,
            inactive: 1
        }
    ));
    assert_eq!(client.health(), HealthStatus::Unhealthy);
    assert_eq!(node.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn caller_cancellation_stops_every_provider() {
    init_logging();
    let a = MockNode::new("a").hanging().build();
    let b = MockNode::new("b").delay_ms(10_000).root(1).build();
    let client = MultiClient::builder()
        .provider(a.clone())
        .provider(b.clone())
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = client
        .beacon_block_root(&ctx, &BlockId::Head)
        .await
        .unwrap_err();
    assert!(matches!(err, MultiError::Cancelled));
    assert!(started.elapsed() <= Duration::from_millis(25));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(a.abandoned(), 1);
    assert_eq!(b.abandoned(), 1);
    assert_eq!(client.health(), HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_context_calls_nobody() {
    init_logging();
    let node = MockNode::new("node").root(1).build();
    let client = MultiClient::builder().provider(node.clone()).build().unwrap();

    let ctx = CallContext::new();
    ctx.cancellation_token().cancel();
    let err = client
        .beacon_block_root(&ctx, &BlockId::Head)
        .await
        .unwrap_err();
    assert!(matches!(err, MultiError::Cancelled));
    assert_eq!(node.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn fast_balances_beat_the_deadline() {
    init_logging();
    let quick = MockNode::new("quick")
        .delay_ms(10)
        .balances(&[(1, 32_000_000_000)])
        .build();
    let silent = MockNode::new("silent").hanging().build();
    let client = MultiClient::builder()
        .provider(quick)
        .provider(silent)
        .build()
        .unwrap();

    let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
    let started = Instant::now();
    let balances = client
        .validator_balances(&ctx, &StateId::Head, &[ValidatorIndex(1)])
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let expected: BTreeMap<_, _> = [(ValidatorIndex(1), Gwei(32_000_000_000))].into_iter().collect();
    assert_eq!(balances, Some(expected));
}

#[tokio::test(start_paused = true)]
async fn deadline_with_no_answer() {
    init_logging();
    let node = MockNode::new("node").hanging().build();
    let client = MultiClient::builder().provider(node.clone()).build().unwrap();

    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let err = client
        .validator_balances(&ctx, &StateId::Head, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, MultiError::DeadlineExceeded { ms: 100 }));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(node.abandoned(), 1);
    assert_eq!(client.health_summary()[0].health.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn configured_request_timeout_applies_without_deadline() {
    init_logging();
    let client = MultiClient::builder()
        .request_timeout(Duration::from_millis(250))
        .provider(MockNode::new("node").hanging().build())
        .build()
        .unwrap();

    let err = client
        .beacon_state_root(&CallContext::new(), &StateId::Head)
        .await
        .unwrap_err();
    assert!(matches!(err, MultiError::DeadlineExceeded { ms: 250 }));
}

#[tokio::test(start_paused = true)]
async fn proposer_duties_without_providers_is_unavailable() {
    init_logging();
    let client = MultiClient::builder().build().unwrap();
    let err = client
        .proposer_duties(&CallContext::new(), Epoch(10), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MultiError::CapabilityUnavailable {
            capability: Capability::ProposerDuties,
            inactive: 0
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn operations_are_routed_by_capability() {
    init_logging();
    let duty = ProposerDuty {
        pubkey: BlsPubKey([4u8; 48]),
        validator_index: ValidatorIndex(12),
        slot: Slot(321),
    };
    let roots = MockNode::new("roots")
        .capabilities(only(Capability::BeaconBlockRoot))
        .root(5)
        .build();
    let duties = MockNode::new("duties")
        .capabilities(only(Capability::ProposerDuties))
        .duties(vec![duty.clone()])
        .build();
    let client = MultiClient::builder()
        .provider(roots.clone())
        .provider(duties.clone())
        .build()
        .unwrap();
    let ctx = CallContext::new();

    let out = client.proposer_duties(&ctx, Epoch(10), &[]).await.unwrap();
    assert_eq!(out, Some(vec![duty]));
    let out = client
        .proposer_duties(&ctx, Epoch(10), &[ValidatorIndex(99)])
        .await
        .unwrap();
    assert_eq!(out, Some(vec![]));
    assert_eq!(roots.calls(), 0);

    let root = client.beacon_block_root(&ctx, &BlockId::Slot(Slot(321))).await.unwrap();
    assert_eq!(root, Some(Root([5u8; 32])));
    assert_eq!(duties.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_data_is_a_successful_answer() {
    init_logging();
    let node = MockNode::new("node").build();
    let client = MultiClient::builder().provider(node).build().unwrap();

    let out = client
        .sync_committee_contribution(&CallContext::new(), Slot(1), 0, Root([0u8; 32]))
        .await
        .unwrap();
    assert_eq!(out, None);
    assert_eq!(client.health_summary()[0].health.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_calls_are_idempotent() {
    init_logging();
    let client = MultiClient::builder()
        .provider(MockNode::new("a").delay_ms(3).root(6).build())
        .provider(MockNode::new("b").delay_ms(4).root(6).build())
        .build()
        .unwrap();
    let ctx = CallContext::new();

    let first = client.beacon_state_root(&ctx, &StateId::Justified).await.unwrap();
    let second = client.beacon_state_root(&ctx, &StateId::Justified).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(client.health(), HealthStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn submissions_are_broadcast_to_every_provider() {
    init_logging();
    let a = MockNode::new("a").build();
    let b = MockNode::new("b")
        .failing(ProviderError::Api {
            status: 400,
            message: "invalid signature".into(),
        })
        .build();
    let c = MockNode::new("c").delay_ms(50).build();
    let client = MultiClient::builder()
        .provider(a.clone())
        .provider(b.clone())
        .provider(c.clone())
        .build()
        .unwrap();

    // a first-success override does not turn the broadcast into a race
    let ctx = CallContext::new().with_strategy(Strategy::FirstSuccess);
    client
        .submit_aggregate_attestations(&ctx, &[aggregate(1), aggregate(2)])
        .await
        .unwrap();
    assert_eq!(a.submitted(), 2);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.submitted(), 2);
    assert_eq!(client.health_summary()[1].health.consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_submission_everywhere_fails() {
    init_logging();
    let client = MultiClient::builder()
        .provider(
            MockNode::new("a")
                .failing(ProviderError::Api {
                    status: 400,
                    message: "bad".into(),
                })
                .build(),
        )
        .build()
        .unwrap();

    let err = client
        .submit_aggregate_attestations(&CallContext::new(), &[aggregate(1)])
        .await
        .unwrap_err();
    assert_eq!(err.failures().map(|r| r.len()), Some(1));
    assert!(!err.is_transient());
}

#[tokio::test(start_paused = true)]
async fn max_parallelism_limits_calls_in_flight() {
    init_logging();
    let client = MultiClient::builder()
        .max_parallelism(1)
        .default_strategy(Strategy::Unanimous)
        .provider(MockNode::new("a").delay_ms(100).root(1).build())
        .provider(MockNode::new("b").delay_ms(100).root(1).build())
        .build()
        .unwrap();

    let started = Instant::now();
    client
        .beacon_block_root(&CallContext::new(), &BlockId::Head)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn duplicate_provider_names_are_rejected() {
    let err = MultiClient::builder()
        .provider(MockNode::new("same").build())
        .provider(MockNode::new("same").build())
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("same"));
}
