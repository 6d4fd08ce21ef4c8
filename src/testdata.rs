//! Test data generation
//!
//! Produces realistic user / transaction / event shaped records for seeding
//! a store during development and benchmarking.

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "William",
    "Elizabeth", "David", "Susan",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson",
];

const STATUSES: &[&str] = &["active", "pending", "inactive", "suspended"];
const CATEGORIES: &[&str] = &["electronics", "clothing", "food", "books", "sports", "toys"];
const COUNTRIES: &[&str] = &["USA", "UK", "Canada", "Germany", "France", "Japan", "Australia"];
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY"];
const EVENT_TYPES: &[&str] = &["login", "logout", "purchase", "view", "click", "error"];
const SEVERITIES: &[&str] = &["info", "warning", "error", "critical"];

/// Generate `count` records of the named kind (`user`, `transaction`, `event`)
pub fn generate(kind: &str, count: usize) -> Result<Vec<Value>> {
    match kind {
        "user" | "users" => Ok((1..=count).map(user_record).collect()),
        "transaction" | "transactions" => Ok((1..=count).map(transaction_record).collect()),
        "event" | "events" => Ok((1..=count).map(event_record).collect()),
        other => Err(Error::config(format!(
            "Unknown record kind '{other}' (expected user, transaction, or event)"
        ))),
    }
}

fn pick(rng: &mut impl Rng, choices: &[&str]) -> String {
    choices
        .choose(rng)
        .copied()
        .unwrap_or_default()
        .to_string()
}

fn user_record(user_id: usize) -> Value {
    let mut rng = rand::thread_rng();
    let first_name = pick(&mut rng, FIRST_NAMES);
    let last_name = pick(&mut rng, LAST_NAMES);

    json!({
        "id": format!("user_{user_id}"),
        "first_name": first_name,
        "last_name": last_name,
        "email": format!(
            "{}.{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        ),
        "age": rng.gen_range(18..=80),
        "country": pick(&mut rng, COUNTRIES),
        "status": pick(&mut rng, STATUSES),
        "balance": (rng.gen_range(0.0..10_000.0_f64) * 100.0).round() / 100.0,
    })
}

fn transaction_record(transaction_id: usize) -> Value {
    let mut rng = rand::thread_rng();

    json!({
        "id": format!("txn_{transaction_id}"),
        "user_id": format!("user_{}", rng.gen_range(1..=1000)),
        "amount": (rng.gen_range(1.0..1_000.0_f64) * 100.0).round() / 100.0,
        "currency": pick(&mut rng, CURRENCIES),
        "category": pick(&mut rng, CATEGORIES),
        "status": pick(&mut rng, &["completed", "pending", "failed"]),
    })
}

fn event_record(event_id: usize) -> Value {
    let mut rng = rand::thread_rng();

    json!({
        "id": format!("event_{event_id}"),
        "event_type": pick(&mut rng, EVENT_TYPES),
        "user_id": format!("user_{}", rng.gen_range(1..=1000)),
        "severity": pick(&mut rng, SEVERITIES),
        "message": format!("Event {event_id} occurred"),
        "metadata": {
            "ip_address": format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255)
            ),
            "user_agent": "Mozilla/5.0",
        },
    })
}
