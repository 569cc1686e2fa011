//! View model builder tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use finguard_core::{
    aggregate::{self, ClientInputs, HEATMAP_CELLS},
    model::{Alert, ClientLink, Record, RiskSnapshot, Transaction, UserProfile},
    types::{AlertType, RiskLevel, Severity, TrendDirection},
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn txn(id: &str, amount: f64, category: Option<&str>, when: DateTime<Utc>) -> Record<Transaction> {
    Record {
        id: id.to_string(),
        data: Transaction {
            amount,
            category: category.map(str::to_string),
            merchant: None,
            description: None,
            timestamp: when,
            kind: None,
            risk_flag: false,
        },
    }
}

fn alert(id: &str, severity: Severity, acknowledged: bool) -> Record<Alert> {
    Record {
        id: id.to_string(),
        data: Alert {
            title: id.to_string(),
            description: String::new(),
            severity,
            alert_type: AlertType::Fraud,
            timestamp: at(1, 9),
            acknowledged,
            action_url: None,
        },
    }
}

fn sample_transactions() -> Vec<Record<Transaction>> {
    vec![
        txn("t1", -40.0, Some("grocery"), at(10, 9)),
        txn("t2", -25.5, Some("Dining"), at(11, 12)),
        txn("t3", 1200.0, Some("salary"), at(11, 8)),
        txn("t4", -60.0, Some("grocery"), at(12, 18)),
        txn("t5", -13.0, None, at(14, 7)),
        txn("t6", -7.25, Some("transport"), at(14, 8)),
    ]
}

#[test]
fn risk_levels_follow_band_edges() {
    assert_eq!(aggregate::risk_level(0.0), RiskLevel::Low);
    assert_eq!(aggregate::risk_level(35.0), RiskLevel::Low);
    assert_eq!(aggregate::risk_level(35.1), RiskLevel::Medium);
    assert_eq!(aggregate::risk_level(60.0), RiskLevel::Medium);
    assert_eq!(aggregate::risk_level(61.0), RiskLevel::High);
    assert_eq!(aggregate::risk_level(80.0), RiskLevel::High);
    assert_eq!(aggregate::risk_level(80.5), RiskLevel::Critical);
}

#[test]
fn spending_counts_only_debits_by_category() {
    let slices = aggregate::spending_by_category(&sample_transactions());
    let names: Vec<&str> = slices.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, ["Dining", "grocery", "other", "transport"]);
    assert_eq!(slices[0].name, "Dining");
    assert_eq!(slices[0].color, "#f59e0b");

    let grocery = &slices[1];
    assert_eq!(grocery.amount, 100.0);
    assert_eq!(grocery.name, "Grocery");
    assert_eq!(slices[2].name, "Other");

    let total: u32 = slices.iter().map(|s| s.percentage).sum();
    assert!((98..=102).contains(&total), "percentages sum to {total}");
}

#[test]
fn spending_is_order_independent() {
    let forward = sample_transactions();
    let mut reversed = forward.clone();
    reversed.reverse();
    assert_eq!(
        aggregate::spending_by_category(&forward),
        aggregate::spending_by_category(&reversed)
    );

    let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    assert_eq!(
        aggregate::spending_trend(&forward, today, 7),
        aggregate::spending_trend(&reversed, today, 7)
    );
}

#[test]
fn spending_sums_do_not_depend_on_arrival_order() {
    // 0.1 + 0.2 + 0.3 and 0.3 + 0.2 + 0.1 differ in the last bit.
    let forward = vec![
        txn("a", -0.1, Some("grocery"), at(14, 9)),
        txn("b", -0.2, Some("grocery"), at(14, 10)),
        txn("c", -0.3, Some("grocery"), at(14, 11)),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let a = aggregate::spending_by_category(&forward);
    let b = aggregate::spending_by_category(&reversed);
    assert_eq!(a, b);
    assert_eq!(a[0].amount.to_bits(), b[0].amount.to_bits());

    let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let trend_a = aggregate::spending_trend(&forward, today, 1);
    let trend_b = aggregate::spending_trend(&reversed, today, 1);
    assert_eq!(trend_a[0].value.to_bits(), trend_b[0].value.to_bits());
}

#[test]
fn category_keys_are_case_sensitive() {
    let txns = vec![
        txn("a", -10.0, Some("Dining"), at(14, 9)),
        txn("b", -30.0, Some("dining"), at(14, 10)),
    ];
    let slices = aggregate::spending_by_category(&txns);
    let keys: Vec<&str> = slices.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(keys, ["Dining", "dining"]);
    assert_eq!(slices[0].percentage, 25);
    assert_eq!(slices[1].percentage, 75);
    assert!(slices.iter().all(|s| s.color == "#f59e0b"));
}

#[test]
fn institution_metrics_follow_thresholds() {
    let now = at(14, 12);
    // Four members, one without a snapshot.
    let metrics = aggregate::institution_metrics(4, &[90.0, 72.0, 30.0], now);
    assert_eq!(metrics.total_customers, 4);
    assert_eq!(metrics.average_risk, 48.0);
    assert_eq!(metrics.high_risk_count, 2);
    assert_eq!(metrics.critical_count, 1);
    assert_eq!(metrics.compliance_rate, 50.0);
    assert_eq!(metrics.updated_at, Some(now));

    // Thresholds are exclusive.
    let edge = aggregate::institution_metrics(2, &[70.0, 85.0], now);
    assert_eq!(edge.high_risk_count, 1);
    assert_eq!(edge.critical_count, 0);

    let empty = aggregate::institution_metrics(0, &[], now);
    assert_eq!(empty.average_risk, 50.0);
    assert_eq!(empty.compliance_rate, 100.0);
    assert_eq!(empty.high_risk_count, 0);
}

#[test]
fn spending_trend_covers_the_window_oldest_first() {
    let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    let trend = aggregate::spending_trend(&sample_transactions(), today, 7);
    assert_eq!(trend.len(), 7);
    assert_eq!(trend[0].date, "Mar 8");
    assert_eq!(trend[6].date, "Mar 14");

    // Mar 10 grocery, Mar 11 dining (salary is a credit), Mar 14 two debits.
    assert_eq!(trend[2].value, 40.0);
    assert_eq!(trend[3].value, 25.5);
    assert_eq!(trend[6].value, 20.25);
    assert_eq!(trend[0].value, 0.0);
}

#[test]
fn empty_inputs_give_empty_models() {
    let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    assert!(aggregate::spending_by_category(&[]).is_empty());
    assert!(aggregate::spending_trend(&[], today, 7).is_empty());
    assert!(aggregate::risk_distribution(&[]).is_empty());
    assert!(aggregate::client_cards(&[]).is_empty());
    assert_eq!(aggregate::alert_summary(&[]).total, 0);

    let heatmap = aggregate::risk_heatmap(&[]);
    assert_eq!(heatmap.len(), HEATMAP_CELLS);
    assert!(heatmap.iter().all(|c| c.count == 0 && c.risk == 0.0));
}

#[test]
fn credits_only_give_no_spending() {
    let credits = vec![txn("t1", 500.0, Some("salary"), at(3, 9))];
    assert!(aggregate::spending_by_category(&credits).is_empty());
}

#[test]
fn heatmap_places_every_score_once() {
    let scores = [0.0, 0.4, 12.7, 12.2, 55.0, 99.9, 100.0, 140.0, -3.0];
    let cells = aggregate::risk_heatmap(&scores);
    assert_eq!(cells.len(), HEATMAP_CELLS);

    let placed: u32 = cells.iter().map(|c| c.count).sum();
    assert_eq!(placed as usize, scores.len());

    assert_eq!(cells[0].count, 3); // 0.0, 0.4 and clamped -3.0
    assert_eq!(cells[12].count, 2);
    assert!((cells[12].risk - 12.45).abs() < 1e-9);
    assert_eq!(cells[99].count, 3); // 99.9, 100.0 and clamped 140.0
    assert_eq!(cells[42].id, "42");
    assert_eq!(cells[42].segment, "Segment 43");
    assert!(cells.iter().all(|c| c.trend == TrendDirection::Stable));
}

#[test]
fn heatmap_and_distribution_ignore_input_order() {
    let scores = vec![81.0, 3.5, 47.25, 47.75, 62.0, 20.0, 21.0, 99.0];
    let mut shuffled = scores.clone();
    shuffled.rotate_left(3);
    shuffled.swap(0, 5);
    assert_eq!(aggregate::risk_heatmap(&scores), aggregate::risk_heatmap(&shuffled));
    assert_eq!(
        aggregate::risk_distribution(&scores),
        aggregate::risk_distribution(&shuffled)
    );
}

#[test]
fn distribution_uses_inclusive_upper_bounds() {
    let buckets = aggregate::risk_distribution(&[20.0, 20.5, 40.0, 60.0, 61.0, 80.0, 80.1, 100.0]);
    let names: Vec<&str> = buckets.iter().map(|b| b.name).collect();
    assert_eq!(names, ["0-20", "21-40", "41-60", "61-80", "81-100"]);
    let counts: Vec<u32> = buckets.iter().map(|b| b.value).collect();
    assert_eq!(counts, [1, 2, 1, 2, 2]);
}

#[test]
fn alert_summary_counts_by_severity() {
    let alerts = vec![
        alert("a1", Severity::High, false),
        alert("a2", Severity::High, true),
        alert("a3", Severity::Low, false),
        alert("a4", Severity::Critical, false),
    ];
    let summary = aggregate::alert_summary(&alerts);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.unacknowledged, 3);
    assert_eq!(summary.by_severity.get(&Severity::High), Some(&2));
    assert_eq!(summary.by_severity.get(&Severity::Medium), None);
}

#[test]
fn client_cards_fill_gaps_with_defaults() {
    let links = [
        ClientLink { client_id: "zed".into(), assigned_at: Some(at(2, 10)) },
        ClientLink { client_id: "amy".into(), assigned_at: None },
        ClientLink { client_id: "kim".into(), assigned_at: None },
    ];
    let amy = UserProfile {
        uid: "amy".into(),
        email: Some("amy.lee@bank.test".into()),
        ..UserProfile::default()
    };
    let kim = UserProfile {
        uid: "kim".into(),
        display_name: Some("Kim Park".into()),
        ..UserProfile::default()
    };
    let zed_score = RiskSnapshot { value: 88.0, trend: TrendDirection::Up, last_updated: None };

    let cards = aggregate::client_cards(&[
        ClientInputs { link: &links[0], profile: None, snapshot: Some(&zed_score) },
        ClientInputs { link: &links[1], profile: Some(&amy), snapshot: None },
        ClientInputs { link: &links[2], profile: Some(&kim), snapshot: None },
    ]);

    let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["amy", "kim", "zed"]);

    assert_eq!(cards[0].name, "amy.lee");
    assert_eq!(cards[0].risk_score, aggregate::DEFAULT_CLIENT_SCORE);
    assert_eq!(cards[0].risk_level, RiskLevel::Medium);
    assert_eq!(cards[0].trend, TrendDirection::Stable);

    assert_eq!(cards[1].name, "Kim Park");

    assert_eq!(cards[2].name, "Unknown Client");
    assert_eq!(cards[2].risk_level, RiskLevel::Critical);
    assert_eq!(cards[2].trend, TrendDirection::Up);
    assert_eq!(cards[2].last_contact, Some(at(2, 10)));
}
