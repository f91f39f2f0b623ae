use serde_json::Value;

/// Fixed number of chunks a map-reduce input is partitioned into. The last
/// chunk absorbs any remainder.
pub const DEFAULT_CHUNK_COUNT: usize = 5;

/// Partitions map-reduce input data into at most `max_chunks` chunks.
///
/// - A JSON array is split into ceil-sized slices: 23 elements over 5
///   chunks yields `[5, 5, 5, 5, 3]`.
/// - A string is split on newlines and the lines are chunked the same way,
///   each chunk rejoined with newlines.
/// - Any other value is a single opaque chunk.
///
/// Inputs smaller than `max_chunks` produce fewer, single-element chunks;
/// an empty array produces no chunks at all.
pub fn partition_chunks(data: &Value, max_chunks: usize) -> Vec<Value> {
    let max_chunks = max_chunks.max(1);
    match data {
        Value::Array(items) => {
            if items.is_empty() {
                return Vec::new();
            }
            let size = items.len().div_ceil(max_chunks);
            items
                .chunks(size)
                .map(|chunk| Value::Array(chunk.to_vec()))
                .collect()
        }
        Value::String(text) => {
            let lines: Vec<&str> = text.split('\n').collect();
            if lines.len() <= 1 {
                return vec![data.clone()];
            }
            let size = lines.len().div_ceil(max_chunks);
            lines
                .chunks(size)
                .map(|chunk| Value::String(chunk.join("\n")))
                .collect()
        }
        other => vec![other.clone()],
    }
}
