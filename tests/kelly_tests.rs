//! Evaluator tests: the worked scenarios plus invariant sweeps over a grid
//! of bankrolls, probabilities and prices.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stake_engine::config::SizingConfig;
use stake_engine::market::models::{Decision, NoBetReason, Opportunity};
use stake_engine::risk::commission::{CommissionPolicy, Platform, RateKind};
use stake_engine::risk::kelly::{evaluate, whole_units};

fn steps(n: i64) -> Vec<Decimal> {
    (1..n).map(|i| Decimal::from(i) / Decimal::from(n)).collect()
}

fn policies() -> Vec<CommissionPolicy> {
    vec![
        CommissionPolicy::free(),
        CommissionPolicy::default(),
        CommissionPolicy::for_platform(Platform::PredictIt).unwrap(),
        CommissionPolicy::new(RateKind::PercentageOfPrice, dec!(0.05)).unwrap(),
    ]
}

#[test]
fn scenario_a_strong_edge_bets_after_commission() {
    let result = evaluate(
        &Opportunity::new("A", dec!(0.68), dec!(0.45)),
        dec!(100),
        &CommissionPolicy::default(),
        &SizingConfig::default(),
    )
    .unwrap();

    assert!(result.is_bet());
    assert_eq!(result.adjusted_unit_price, dec!(0.47));
    assert_eq!(result.expected_value_pct.round_dp(2), dec!(44.68));
    assert_eq!(result.gross_expected_value_pct.round_dp(1), dec!(51.1));
    assert!(result.units_to_buy() > 0);
    assert_eq!(result.commission_impact_pct().round_dp(2), dec!(6.43));
}

#[test]
fn scenario_b_zero_edge_is_below_threshold() {
    let result = evaluate(
        &Opportunity::new("B", dec!(0.50), dec!(0.50)),
        dec!(100),
        &CommissionPolicy::free(),
        &SizingConfig::default(),
    )
    .unwrap();

    assert_eq!(result.expected_value_pct, Decimal::ZERO);
    assert_eq!(
        result.decision,
        Decision::NoBet {
            reason: NoBetReason::BelowEvThreshold { threshold_pct: dec!(10.0) }
        }
    );
    assert_eq!(result.units_to_buy(), 0);
}

#[test]
fn scenario_b_with_commission_stays_no_bet() {
    let result = evaluate(
        &Opportunity::new("B", dec!(50), dec!(50)),
        dec!(100),
        &CommissionPolicy::default(),
        &SizingConfig::default(),
    )
    .unwrap();
    assert!(result.expected_value_pct < Decimal::ZERO);
    assert_eq!(result.reason().map(|r| r.code()), Some("BELOW_EV_THRESHOLD"));
}

#[test]
fn scenario_d_whole_unit_rounding() {
    let fill = whole_units(dec!(14.999), dec!(0.45));
    assert_eq!(fill.units, 33);
    assert_eq!(fill.actual_amount, dec!(14.85));
    assert_eq!(fill.unused_amount, dec!(0.149));
}

#[test]
fn zero_threshold_zero_edge_is_non_positive_kelly() {
    let config = SizingConfig {
        min_ev_threshold_pct: Decimal::ZERO,
        ..Default::default()
    };
    let result = evaluate(
        &Opportunity::new("even", dec!(0.5), dec!(0.5)),
        dec!(100),
        &CommissionPolicy::free(),
        &config,
    )
    .unwrap();
    assert_eq!(result.reason().map(|r| r.code()), Some("NON_POSITIVE_KELLY"));
}

#[test]
fn tiny_bankroll_cannot_afford_one_unit() {
    let result = evaluate(
        &Opportunity::new("small", dec!(0.68), dec!(0.45)),
        dec!(2),
        &CommissionPolicy::default(),
        &SizingConfig::default(),
    )
    .unwrap();
    // 15% of $2 is $0.30, below one $0.47 unit
    assert_eq!(
        result.reason(),
        Some(NoBetReason::CannotAffordOneUnit { target_amount: dec!(0.30) })
    );
    assert_eq!(result.target_amount(), dec!(0.30));
}

#[test]
fn invalid_inputs_name_the_field() {
    let commission = CommissionPolicy::default();
    let config = SizingConfig::default();
    let cases = [
        (Opportunity::new("x", dec!(150), dec!(0.45)), dec!(100), "win_probability"),
        (Opportunity::new("x", dec!(-0.1), dec!(0.45)), dec!(100), "win_probability"),
        (Opportunity::new("x", dec!(0.6), Decimal::ZERO), dec!(100), "unit_price"),
        (Opportunity::new("x", dec!(0.6), dec!(150)), dec!(100), "unit_price"),
        (Opportunity::new("  ", dec!(0.6), dec!(0.45)), dec!(100), "identifier"),
        (Opportunity::new("x", dec!(0.6), dec!(0.45)), Decimal::ZERO, "bankroll"),
    ];
    for (opportunity, bankroll, field) in cases {
        let err = evaluate(&opportunity, bankroll, &commission, &config).unwrap_err();
        assert_eq!(err.field(), Some(field), "{opportunity:?}");
    }
}

#[test]
fn percentage_and_fraction_inputs_agree() {
    let config = SizingConfig::default();
    for policy in policies() {
        let fractional = evaluate(
            &Opportunity::new("g", dec!(0.68), dec!(0.45)),
            dec!(250),
            &policy,
            &config,
        )
        .unwrap();
        let percent = evaluate(
            &Opportunity::new("g", dec!(68), dec!(45)),
            dec!(250),
            &policy,
            &config,
        )
        .unwrap();
        assert_eq!(fractional, percent);
    }
}

#[test]
fn sizing_invariants_hold_across_grid() {
    let config = SizingConfig::default();
    let bankrolls = [dec!(1), dec!(10), dec!(100), dec!(1000), dec!(12345.67)];

    for policy in policies() {
        for p in steps(20) {
            for price in steps(20) {
                for bankroll in bankrolls {
                    let opportunity = Opportunity::new("grid", p, price);
                    let result = evaluate(&opportunity, bankroll, &policy, &config).unwrap();

                    if result.expected_value_pct < config.min_ev_threshold_pct {
                        assert_eq!(
                            result.reason().map(|r| r.code()),
                            Some("BELOW_EV_THRESHOLD")
                        );
                    }

                    if let Some(sizing) = result.sizing() {
                        assert!(sizing.unused_amount >= Decimal::ZERO);
                        assert!(sizing.actual_amount <= sizing.target_amount);
                        assert!(sizing.kelly_fraction_used <= config.max_bet_pct);
                        assert!(sizing.units_to_buy >= 1);
                        assert_eq!(
                            sizing.actual_amount,
                            Decimal::from(sizing.units_to_buy) * result.adjusted_unit_price
                        );
                        assert!(sizing.actual_amount <= bankroll);
                    }
                }
            }
        }
    }
}

#[test]
fn cap_binds_for_large_edges() {
    let config = SizingConfig::default();
    let result = evaluate(
        &Opportunity::new("lock", dec!(0.95), dec!(0.10)),
        dec!(1000),
        &CommissionPolicy::free(),
        &config,
    )
    .unwrap();
    let sizing = result.sizing().unwrap();
    assert!(sizing.capped);
    assert_eq!(sizing.kelly_fraction_used, dec!(0.15));
    assert_eq!(sizing.target_amount, dec!(150.00));
    assert_eq!(sizing.units_to_buy, 1500);
}

#[test]
fn units_never_decrease_with_bankroll() {
    let config = SizingConfig::default();
    let policy = CommissionPolicy::default();

    for p in steps(10) {
        for price in steps(10) {
            let opportunity = Opportunity::new("mono", p, price);
            let mut previous = 0u64;
            for bankroll in (1..=60).map(|i| Decimal::from(i * 25)) {
                let units = evaluate(&opportunity, bankroll, &policy, &config)
                    .unwrap()
                    .units_to_buy();
                assert!(units >= previous, "p={p} price={price} bankroll={bankroll}");
                previous = units;
            }
        }
    }
}

#[test]
fn whole_units_floors_across_prices() {
    for price in steps(50) {
        for amount in [dec!(0.01), dec!(1), dec!(7.77), dec!(100)] {
            let fill = whole_units(amount, price);
            assert!(fill.unused_amount >= Decimal::ZERO);
            assert!(fill.unused_amount < price);
            assert_eq!(fill.actual_amount + fill.unused_amount, amount);
        }
    }
}
