use chrono::Local;

/// A lexicographically sortable local timestamp, used as the `datestamp`
/// field on every `TestRecord` this binary writes.
pub fn now_timestamp() -> String {
  Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}
