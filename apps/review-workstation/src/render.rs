use std::fmt::Write as _;

use fraud_review_client::{
    CaseDetail, MonitoringSnapshot, QueueEntry, ReviewActionReceipt, Timestamp,
};
use fraud_review_core::{ReviewState, ReviewView};
use serde_json::Value;

const KEY_FEATURE_LIMIT: usize = 10;

/// Up to four decimals, trailing zeros and a dangling point removed.
pub fn fmt_number(value: f64) -> String {
    let fixed = format!("{value:.4}");
    if !fixed.contains('.') {
        return fixed;
    }
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn fmt_optional_number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), fmt_number)
}

fn fmt_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number
            .as_f64()
            .map_or_else(|| number.to_string(), fmt_number),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn fmt_timestamp(timestamp: Option<&Timestamp>) -> String {
    timestamp.map_or_else(|| "-".to_string(), ToString::to_string)
}

pub fn render_state(state: &ReviewState, analyst: &str) -> String {
    let mut out = String::new();
    let tabs = match state.view {
        ReviewView::Review => "[Review]  Monitoring",
        ReviewView::Monitoring => " Review  [Monitoring]",
    };
    let _ = writeln!(out, "== Fraud Platform ==  {tabs}  analyst: {analyst}");
    if let Some(message) = state.errors.message() {
        let _ = writeln!(out, "! {message}");
    }
    if let Some(ticket) = state.action.in_flight() {
        let _ = writeln!(
            out,
            "... recording {} for {}",
            ticket.action.as_str(),
            ticket.transaction_id
        );
    }

    match state.view {
        ReviewView::Review => {
            let loading = if state.queue.loading {
                " refreshing..."
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "\n-- Review Queue ({}){loading} --",
                state.queue.entries.len()
            );
            out.push_str(&render_queue(
                &state.queue.entries,
                state.selection.as_deref(),
            ));
            let _ = writeln!(out, "\n-- Case Details --");
            match (&state.selection, &state.case.detail) {
                (None, _) => out.push_str("Select a transaction from the queue.\n"),
                (Some(_), _) if state.case.loading => out.push_str("Loading case...\n"),
                (Some(_), None) => out.push_str("No case data.\n"),
                (Some(_), Some(detail)) => out.push_str(&render_case(detail)),
            }
        }
        ReviewView::Monitoring => {
            let loading = if state.monitoring.loading {
                " loading..."
            } else {
                ""
            };
            let _ = writeln!(out, "\n-- Monitoring{loading} --");
            match &state.monitoring.snapshot {
                Some(snapshot) => out.push_str(&render_monitoring(snapshot)),
                None => out.push_str("No monitoring data loaded.\n"),
            }
        }
    }
    out
}

pub fn render_queue(entries: &[QueueEntry], selection: Option<&str>) -> String {
    if entries.is_empty() {
        return "No manual reviews right now.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<24} {:>5} {:>8} {:>12} {:<4} {:<20} {}",
        "transaction", "risk", "prob", "amount", "cc", "merchant", "user"
    );
    for entry in entries {
        let marker = if selection == Some(entry.transaction_id.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker} {:<24} {:>5} {:>8} {:>12} {:<4} {:<20} {}",
            entry.transaction_id,
            entry.risk_score,
            fmt_number(entry.fraud_probability),
            fmt_number(entry.amount),
            entry.country,
            entry.merchant,
            entry.user_id
        );
    }
    out
}

pub fn render_case(detail: &CaseDetail) -> String {
    let mut out = String::new();
    let tx = &detail.transaction;
    let _ = writeln!(
        out,
        "TX: {}  User: {}  Device: {}  Card: {}",
        tx.transaction_id, tx.user_id, tx.device_id, tx.card_id
    );
    let _ = writeln!(out, "Amount:   {} {}", fmt_number(tx.amount), tx.currency);
    let _ = writeln!(out, "Merchant: {} ({})", tx.merchant, tx.merchant_category);
    let _ = writeln!(out, "Country:  {}", tx.country);
    let _ = writeln!(out, "Time:     {}", fmt_timestamp(tx.timestamp.as_ref()));

    match &detail.assessment {
        Some(assessment) => {
            let _ = writeln!(out, "Decision: {}", assessment.decision.as_str());
            let _ = writeln!(out, "Risk score: {}", assessment.risk_score);
            let _ = writeln!(
                out,
                "Fraud prob: {}",
                fmt_number(assessment.fraud_probability)
            );
        }
        None => out.push_str("Decision: -\n"),
    }

    out.push_str("Top reasons:\n");
    let reasons = detail.reasons();
    if reasons.is_empty() {
        out.push_str("  No reasons available.\n");
    }
    for reason in reasons {
        let _ = writeln!(
            out,
            "  {}  value={} contribution={}",
            reason.feature,
            fmt_optional_number(reason.value),
            fmt_number(reason.contribution)
        );
    }

    out.push_str("Key features:\n");
    if detail.features.is_none() {
        out.push_str("  No features found.\n");
    }
    for (key, value) in detail.key_features(KEY_FEATURE_LIMIT) {
        let _ = writeln!(out, "  {key}: {}", fmt_value(value));
    }

    out.push_str("Review history:\n");
    if detail.review_history.is_empty() {
        out.push_str("  No analyst actions yet.\n");
    }
    for action in &detail.review_history {
        let _ = writeln!(
            out,
            "  #{} {} by {} at {}{}",
            action.id,
            action.action,
            action.analyst,
            action.created_at,
            action
                .notes
                .as_deref()
                .map(|notes| format!(" - {notes}"))
                .unwrap_or_default()
        );
    }
    out
}

pub fn render_monitoring(snapshot: &MonitoringSnapshot) -> String {
    let mut out = String::new();
    let summary = &snapshot.summary;
    let _ = writeln!(
        out,
        "Total: {}  Approve: {}  Manual review: {}  Block: {}",
        summary.total, summary.approve, summary.manual_review, summary.block
    );

    out.push_str("Risk score buckets:\n");
    if snapshot.score_buckets.is_empty() {
        out.push_str("  No data.\n");
    }
    for bucket in &snapshot.score_buckets {
        let _ = writeln!(out, "  {:<8} {}", bucket.bucket, bucket.count);
    }

    out.push_str("Top merchants:\n");
    if snapshot.top_merchants.is_empty() {
        out.push_str("  No data.\n");
    }
    for merchant in &snapshot.top_merchants {
        let _ = writeln!(
            out,
            "  {:<20} tx={} avg_risk={} reviews={} blocks={}",
            merchant.merchant,
            merchant.tx_count,
            fmt_number(merchant.avg_risk),
            merchant.reviews,
            merchant.blocks
        );
    }
    out
}

pub fn render_receipt(receipt: &ReviewActionReceipt) -> String {
    format!(
        "recorded #{} {} on {} by {} at {}\n",
        receipt
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string()),
        receipt.action.as_deref().unwrap_or("-"),
        receipt.transaction_id.as_deref().unwrap_or("-"),
        receipt.analyst.as_deref().unwrap_or("-"),
        fmt_timestamp(receipt.created_at.as_ref())
    )
}
