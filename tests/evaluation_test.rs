mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, RecordingGateways};
use fincontract_eval::currency::Currency;
use fincontract_eval::timestamp::{FixedClock, Timestamp};
use fincontract_eval::{EvalError, Evaluator, Interval, Node};
use pretty_assertions::assert_eq;
use strum::IntoEnumIterator;

const NOW: i64 = 1_700_000_000;

fn evaluator(gateways: Arc<RecordingGateways>) -> Evaluator {
    Evaluator::new(gateways).with_clock(Arc::new(FixedClock(Timestamp::from_secs(NOW))))
}

// [lo, hi] in USD, built only from static combinators.
fn usd_between(lo: f64, hi: f64) -> Node {
    Node::or(
        Node::scale(lo, Node::one(Currency::Usd)),
        Node::scale(hi, Node::one(Currency::Usd)),
    )
}

#[tokio::test]
async fn test_zero_is_zero_everywhere() {
    let gateways = Arc::new(RecordingGateways::new());
    let result = evaluator(gateways).evaluate(&Node::zero(), "estimate").await.unwrap();
    assert_eq!(result.len(), 6);
    assert!(result.iter().all(|interval| *interval == Interval::ZERO));
}

#[tokio::test]
async fn test_one_is_unit_at_its_currency() {
    let evaluator = evaluator(Arc::new(RecordingGateways::new()));
    for currency in Currency::iter() {
        let result = evaluator
            .evaluate(&Node::one(currency), "estimate")
            .await
            .unwrap();
        for (index, interval) in result.iter().enumerate() {
            if index == currency.index() {
                assert_eq!(*interval, Interval::UNIT);
            } else {
                assert_eq!(*interval, Interval::ZERO);
            }
        }
        let total: f64 = result.iter().map(|interval| interval.lo).sum();
        assert_eq!(total, 1.0);
    }
}

#[tokio::test]
async fn test_one_out_of_range_currency() {
    let evaluator = evaluator(Arc::new(RecordingGateways::new()));
    let result = evaluator.evaluate(&Node::one(6usize), "estimate").await;
    assert!(matches!(
        result,
        Err(EvalError::InvalidCurrency { index: 6, count: 6 })
    ));
}

#[tokio::test]
async fn test_scale_obs_default_range() {
    let evaluator = evaluator(Arc::new(RecordingGateways::new()));
    let tree = Node::scale_obs("0xfeed", usd_between(10.0, 20.0));

    let result = evaluator.evaluate(&tree, "estimate").await.unwrap();
    let usd = result.get(Currency::Usd.index()).unwrap();
    assert_eq!(usd.lo, 10.0);
    assert!((usd.hi - 24.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_expired_timebound_is_zero_in_both_modes() {
    let gateways = Arc::new(
        RecordingGateways::new()
            .with_boolean("0xb0", true)
            .with_scalar("0xc0", 3.0),
    );
    let evaluator = evaluator(gateways.clone());
    let tree = Node::timebound(
        NOW - 1_000,
        NOW - 1,
        Node::if_else(
            "0xb0",
            Node::scale_obs("0xc0", Node::one(Currency::Eur)),
            Node::one(Currency::Gbp),
        ),
    );

    for mode in ["estimate", "direct"] {
        let result = evaluator.evaluate(&tree, mode).await.unwrap();
        assert!(
            result.iter().all(|interval| *interval == Interval::ZERO),
            "{} evaluation should be zero, got {}",
            mode,
            result
        );
    }
}

#[tokio::test]
async fn test_open_timebound_keeps_child() {
    let evaluator = evaluator(Arc::new(RecordingGateways::new()));
    let tree = Node::timebound(0, NOW, Node::scale(2.0, Node::one(Currency::Jpy)));

    let result = evaluator.evaluate(&tree, "estimate").await.unwrap();
    assert_eq!(result.get(Currency::Jpy.index()), Some(&Interval::point(2.0)));
}

#[tokio::test]
async fn test_direct_refreshes_every_oracle_before_any_read() {
    let gateways = Arc::new(
        RecordingGateways::new()
            .with_boolean("0xb1", true)
            .with_boolean("0xb2", false)
            .with_scalar("0xc1", 2.0)
            .with_scalar("0xc2", 0.5)
            .with_delay("0xb1", Duration::from_millis(30))
            .with_delay("0xc2", Duration::from_millis(10)),
    );
    let tree = Node::and(
        Node::if_else(
            "0xb1",
            Node::scale_obs("0xc1", Node::scale(10.0, Node::one(Currency::Usd))),
            Node::zero(),
        ),
        Node::if_else(
            "0xb2",
            Node::one(Currency::Eur),
            Node::give(Node::scale_obs("0xc2", Node::one(Currency::Eur))),
        ),
    );

    let result = evaluator(gateways.clone())
        .evaluate(&tree, "direct")
        .await
        .unwrap();
    assert_eq!(result.get(Currency::Usd.index()), Some(&Interval::point(20.0)));
    assert_eq!(result.get(Currency::Eur.index()), Some(&Interval::point(-0.5)));

    let calls = gateways.calls();
    let last_refresh = calls
        .iter()
        .rposition(|call| matches!(call, Call::RefreshFinished(_)))
        .unwrap();
    let first_read = calls
        .iter()
        .position(|call| matches!(call, Call::ReadBoolean(_) | Call::ReadScalar(_)))
        .unwrap();
    assert!(last_refresh < first_read, "calls out of order: {:?}", calls);

    let mut refreshed = gateways.refreshed();
    refreshed.sort();
    assert_eq!(refreshed, vec!["0xb1", "0xb2", "0xc1", "0xc2"]);
}

#[tokio::test]
async fn test_direct_if_selects_branch_from_oracle() {
    let gateways = Arc::new(
        RecordingGateways::new()
            .with_boolean("0xb1", false)
            .with_scalar("0xc1", 2.0)
            .with_scalar("0xc2", 4.0),
    );
    let tree = Node::if_else(
        "0xb1",
        Node::scale_obs("0xc1", Node::one(Currency::Usd)),
        Node::scale_obs("0xc2", Node::one(Currency::Usd)),
    );

    let result = evaluator(gateways.clone())
        .evaluate(&tree, "direct")
        .await
        .unwrap();
    assert_eq!(result.get(Currency::Usd.index()), Some(&Interval::point(4.0)));
    // Both branches are still refreshed.
    assert_eq!(gateways.refreshed().len(), 3);
}

#[tokio::test]
async fn test_bogus_mode_makes_no_gateway_calls() {
    let gateways = Arc::new(RecordingGateways::new().with_boolean("0xb1", true));
    let tree = Node::if_else("0xb1", Node::one(Currency::Usd), Node::zero());

    let result = evaluator(gateways.clone()).evaluate(&tree, "bogus").await;
    assert!(matches!(result, Err(EvalError::InvalidMode(_))));
    assert!(gateways.calls().is_empty());
}

#[tokio::test]
async fn test_estimate_makes_no_gateway_calls() {
    let gateways = Arc::new(RecordingGateways::new());
    let tree = Node::if_else(
        "0xb1",
        Node::scale_obs("0xc1", Node::one(Currency::Usd)),
        Node::give(Node::one(Currency::Usd)),
    );

    evaluator(gateways.clone())
        .evaluate(&tree, "estimate")
        .await
        .unwrap();
    assert!(gateways.calls().is_empty());
}

#[tokio::test]
async fn test_direct_read_failure_names_gateway() {
    // Refresh succeeds but the oracle holds no value.
    let gateways = Arc::new(RecordingGateways::new());
    let tree = Node::scale_obs("0xc1", Node::one(Currency::Usd));

    match evaluator(gateways).evaluate(&tree, "direct").await {
        Err(EvalError::OracleRead { address, .. }) => assert_eq!(address.as_str(), "0xc1"),
        other => panic!("Expected OracleRead, got {:?}", other),
    }
}
