pub fn remove_trailling_slash(string: &str) -> String {
    if let Some(end) = string.strip_suffix('/') {
        end.to_string()
    } else {
        string.to_string()
    }
}

/// Accepts `bucket`, `bucket/` and `gs://bucket`.
pub fn to_bucket_name(bucket: &str) -> String {
    let bucket = bucket.strip_prefix("gs://").unwrap_or(bucket);
    remove_trailling_slash(bucket)
}
