//! Deterministic demo data.
//!
//! One account per tier plus a population of consumers. The
//! institution account gets every consumer as a member; the analyst is
//! linked to a seeded subset.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use finguard_core::{
    auth::LocalAuthProvider,
    hub::LiveHub,
    path::{CollectionPath, DocPath},
    types::Tier,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde_json::json;

pub const DEMO_PASSWORD: &str = "finguard-demo";

const CATEGORIES: &[&str] = &[
    "grocery", "dining", "transport", "utilities", "entertainment", "shopping", "healthcare",
];
const MERCHANTS: &[&str] = &[
    "Corner Market", "Metro Transit", "City Power", "Streamly", "Cafe Lumen", "MegaMart",
    "Northside Pharmacy",
];
const FIRST_NAMES: &[&str] = &[
    "Ava", "Ben", "Chloe", "Dev", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonah",
];
const LAST_NAMES: &[&str] = &["Adler", "Brooks", "Chen", "Diaz", "Evans", "Okafor", "Patel"];

pub struct DemoAccounts {
    pub consumer:    String,
    pub institution: String,
    pub analyst:     String,
}

pub fn seed_demo(
    hub: &mut LiveHub,
    auth: &mut LocalAuthProvider,
    seed: u64,
    customers: usize,
    now: DateTime<Utc>,
) -> Result<DemoAccounts> {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);

    let consumer_email = "consumer@finguard.demo";
    hub.sign_up(auth, consumer_email, DEMO_PASSWORD, "Demo Consumer", Tier::Consumer)
        .map_err(|e| anyhow::anyhow!("seeding consumer: {e}"))?;
    let consumer_id = signed_in_identity(hub)?;
    seed_consumer(hub, &mut rng, &consumer_id, now)?;

    let mut population = Vec::with_capacity(customers);
    for i in 0..customers {
        let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Client");
        let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Doe");
        let email = format!("{}.{}{i}@finguard.demo", first.to_lowercase(), last.to_lowercase());
        hub.sign_up(auth, &email, DEMO_PASSWORD, &format!("{first} {last}"), Tier::Consumer)
            .map_err(|e| anyhow::anyhow!("seeding customer {i}: {e}"))?;
        let id = signed_in_identity(hub)?;
        seed_consumer(hub, &mut rng, &id, now)?;
        population.push(id);
    }
    population.push(consumer_id.clone());

    hub.sign_up(auth, "institution@finguard.demo", DEMO_PASSWORD, "Demo Bank", Tier::Institution)
        .map_err(|e| anyhow::anyhow!("seeding institution: {e}"))?;
    let institution_id = signed_in_identity(hub)?;
    let inst = hub.config().default_institution_id.clone();
    seed_institution(hub, &mut rng, &inst, &population, now)?;

    hub.sign_up(auth, "analyst@finguard.demo", DEMO_PASSWORD, "Demo Analyst", Tier::Analyst)
        .map_err(|e| anyhow::anyhow!("seeding analyst: {e}"))?;
    let analyst_id = signed_in_identity(hub)?;
    let linked: Vec<&String> = population
        .choose_multiple(&mut rng, population.len().min(6))
        .collect();
    for (i, client) in linked.into_iter().enumerate() {
        let assigned = now - Duration::days(rng.gen_range(1..60));
        hub.store().set_document(
            &DocPath::client_link(&analyst_id, &format!("link-{i}"))?,
            &json!({ "clientId": client, "assignedAt": assigned }),
        )?;
    }

    hub.sign_out();
    log::info!(
        "seeded {} consumers, institution {inst}, analyst {analyst_id}",
        population.len()
    );
    Ok(DemoAccounts {
        consumer: consumer_id,
        institution: institution_id,
        analyst: analyst_id,
    })
}

fn signed_in_identity(hub: &LiveHub) -> Result<String> {
    hub.session()
        .map(|s| s.identity.clone())
        .ok_or_else(|| anyhow::anyhow!("sign-up did not bind a session"))
}

fn seed_consumer(
    hub: &LiveHub,
    rng: &mut Pcg64Mcg,
    user: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let store = hub.store();
    let score: f64 = rng.gen_range(5.0..95.0);
    let trend = ["up", "down", "stable"].choose(rng).copied().unwrap_or("stable");
    store.set_document(
        &DocPath::risk_snapshot(user)?,
        &json!({ "value": (score * 10.0).round() / 10.0, "trend": trend, "lastUpdated": now }),
    )?;

    let transactions = CollectionPath::transactions(user)?;
    for i in 0..rng.gen_range(8..24) {
        let debit = rng.gen_bool(0.8);
        let amount: f64 = (rng.gen_range(3.0..250.0) * 100.0_f64).round() / 100.0;
        let at = now - Duration::minutes(rng.gen_range(0..7 * 24 * 60));
        store.set_document(
            &transactions.doc(&format!("txn-{i:03}"))?,
            &json!({
                "amount": if debit { -amount } else { amount },
                "category": CATEGORIES.choose(rng).copied().unwrap_or("other"),
                "merchant": MERCHANTS.choose(rng).copied().unwrap_or("Unknown"),
                "timestamp": at,
                "type": if debit { "debit" } else { "credit" },
                "riskFlag": debit && amount > 200.0,
            }),
        )?;
    }

    let alerts = CollectionPath::alerts(user)?;
    for i in 0..rng.gen_range(0..4) {
        let severity = ["low", "medium", "high", "critical"].choose(rng).copied().unwrap_or("low");
        let kind = ["predictive", "fraud", "compliance"].choose(rng).copied().unwrap_or("fraud");
        store.set_document(
            &alerts.doc(&format!("alert-{i}"))?,
            &json!({
                "title": format!("{} alert", capitalize(kind)),
                "description": "Unusual activity detected on your account.",
                "severity": severity,
                "type": kind,
                "timestamp": now - Duration::hours(rng.gen_range(1..72)),
                "acknowledged": false,
            }),
        )?;
    }
    Ok(())
}

fn seed_institution(
    hub: &LiveHub,
    rng: &mut Pcg64Mcg,
    inst: &str,
    members: &[String],
    now: DateTime<Utc>,
) -> Result<()> {
    let store = hub.store();
    for member in members {
        store.set_document(
            &DocPath::institution_member(inst, member)?,
            &json!({ "userId": member, "joinedAt": now - Duration::days(rng.gen_range(30..720)) }),
        )?;
    }
    let metrics = store.refresh_institution_metrics(inst, now)?;
    log::info!(
        "institution {inst}: average risk {:.1}, {} high risk",
        metrics.average_risk,
        metrics.high_risk_count
    );
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
