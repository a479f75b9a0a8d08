//! Human-readable order codes: `ORD-<01|02>-<DDMMYYYY>-<vendorId>-<seq>`.

use chrono::NaiveDate;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::OrderType;

pub const SEQUENTIAL_ATTEMPTS: i64 = 10;
pub const RANDOM_ATTEMPTS: usize = 10;

pub fn format_order_code(order_type: OrderType, date: NaiveDate, vendor_id: i32, seq: i64) -> String {
    format!(
        "ORD-{}-{}-{}-{:03}",
        order_type.code_segment(),
        date.format("%d%m%Y"),
        vendor_id,
        seq
    )
}

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ORD-(01|02)-(\d{8})-(\d+)-(\d{3,})$").expect("order code pattern is valid")
    })
}

pub fn is_order_code(text: &str) -> bool {
    pattern().is_match(text.trim().to_ascii_uppercase().as_str())
}

/// Sequence numbers to try, in order: `first..first+10`, then random
/// values in `900..=999`.
pub fn candidate_sequences(first: i64) -> Vec<i64> {
    let mut seqs: Vec<i64> = (first..first + SEQUENTIAL_ATTEMPTS).collect();
    let mut rng = rand::thread_rng();
    seqs.extend((0..RANDOM_ATTEMPTS).map(|_| rng.gen_range(900..=999)));
    seqs
}
