use fraud_review_client::QueueEntry;

/// Recomputes the selection after a queue refresh.
///
/// The result is always `None` or the id of an entry in `queue`. A selection
/// that is still queued is kept; otherwise the first entry, in backend order,
/// is picked.
#[must_use]
pub fn resolve_selection(queue: &[QueueEntry], previous: Option<&str>) -> Option<String> {
    if let Some(previous) = previous
        && queue_contains(queue, previous)
    {
        return Some(previous.to_string());
    }
    queue.first().map(|entry| entry.transaction_id.clone())
}

#[must_use]
pub fn queue_contains(queue: &[QueueEntry], transaction_id: &str) -> bool {
    queue
        .iter()
        .any(|entry| entry.transaction_id == transaction_id)
}
