use hts_fees::*;
use hts_primitives::{AccountId, Timestamp};
use proptest::prelude::*;

fn schedule_with(op: PricedOperation, price: OperationPrice) -> FeeSchedule {
    let mut schedule = FeeSchedule::default();
    schedule.prices.insert(op, price);
    schedule
}

#[test]
fn gas_uses_floor_when_metered_fee_is_lower() {
    // 1 hbar = 12 cents; floor of 6_000 tinycents = 500 tinybars.
    let schedule = schedule_with(
        PricedOperation::Associate,
        OperationPrice { components: FeeComponents { node: 1, network: 1, service: 10 }, minimum: 6_000 },
    );
    let quote = quote(&schedule, PricedOperation::Associate, Timestamp::from_seconds(1)).unwrap();
    assert_eq!(quote.minimum_tinybars(), 500);
    assert_eq!(quote.total_tinybars(), 1);
    // ceil(500 / 7) = 72, plus 72 / 5 = 14.
    assert_eq!(gas_requirement(&quote, 7).unwrap(), 86);
}

#[test]
fn gas_requires_positive_price() {
    let schedule = schedule_with(PricedOperation::Query, OperationPrice::default());
    let quote = quote(&schedule, PricedOperation::Query, Timestamp::default()).unwrap();
    assert_eq!(gas_requirement(&quote, 0), Err(FeeError::ZeroGasPrice));
}

#[test]
fn unpriced_operation_is_an_error() {
    let err = quote(&FeeSchedule::default(), PricedOperation::Mint, Timestamp::default()).unwrap_err();
    assert_eq!(err, FeeError::MissingPrice(PricedOperation::Mint));
}

#[test]
fn reconcile_refunds_excess_and_funds_collector() {
    let schedule = schedule_with(
        PricedOperation::TokenCreate,
        OperationPrice { components: FeeComponents { node: 1_200, network: 1_200, service: 9_600 }, minimum: 0 },
    );
    let quote = quote(&schedule, PricedOperation::TokenCreate, Timestamp::default()).unwrap();
    let r = reconcile(1_500, &quote).unwrap();
    assert_eq!(r.charge, 1_000);
    assert_eq!(r.refund_to_sender, 500);
    assert_eq!(r.top_up_to_fee_collector, 1_000);

    let sender = AccountId::from_num(1001);
    let funding = AccountId::from_num(98);
    assert_eq!(credit_plan(&r, sender, funding), vec![(sender, 500), (funding, 1_000)]);

    assert_eq!(
        reconcile(999, &quote),
        Err(FeeError::InsufficientValue { required: 1_000, attached: 999 })
    );
}

proptest! {
    #[test]
    fn reconcile_never_undercharges_and_refunds_all_excess(
        node in 0u64..1_000_000,
        network in 0u64..1_000_000,
        service in 0u64..1_000_000,
        hbar in 1u32..50,
        cents in 1u32..50,
        extra in 0u64..10_000_000,
    ) {
        let q = FeeQuote {
            components: FeeComponents { node, network, service },
            minimum: 0,
            rate: ExchangeRate { hbar_equiv: hbar, cent_equiv: cents, expiration_time: u64::MAX },
        };
        let quoted = tinycents_to_tinybars(node + network + service, &q.rate);
        let value = quoted + extra;
        let r = reconcile(value, &q).unwrap();
        prop_assert!(r.charge >= quoted);
        prop_assert_eq!(r.refund_to_sender, value - r.charge);
        prop_assert_eq!(r.charge + r.refund_to_sender, value);
    }
}
