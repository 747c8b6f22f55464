//! Per-batch deduplication.

use std::collections::HashMap;
use std::hash::Hash;

/// Collapses `records` to one record per key.
///
/// The surviving record is the last one seen for its key; the output keeps
/// the position at which each key first appeared.
pub fn dedupe<T, K, F>(records: Vec<T>, key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut slots: Vec<Option<T>> = Vec::with_capacity(records.len());
    let mut positions: HashMap<K, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let key = key_fn(&record);
        match positions.get(&key) {
            Some(&pos) => slots[pos] = Some(record),
            None => {
                positions.insert(key, slots.len());
                slots.push(Some(record));
            }
        }
    }

    slots.into_iter().flatten().collect()
}
