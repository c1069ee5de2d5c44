//! Response envelope probing.
//!
//! The generation service returns identifiers, statuses and image URLs in
//! several layouts depending on endpoint and sync/async mode. All field
//! extraction lives here, as an explicit ordered list of strategies, so the
//! probing order is visible in one place and testable without network code.

use serde_json::Value;

type UrlStrategy = fn(&Value) -> Vec<String>;

/// URL extraction strategies in priority order: a `results` array, a singular
/// `image_url` field, then a nested `data` array. The first strategy yielding
/// any URLs wins.
const URL_STRATEGIES: &[UrlStrategy] = &[urls_from_results, url_from_image_url, urls_from_data];

/// Extract image URLs from a response object, trying each strategy in order.
/// URLs are whitespace-trimmed; empty strings are dropped.
pub fn image_urls(value: &Value) -> Vec<String> {
    URL_STRATEGIES
        .iter()
        .map(|strategy| strategy(value))
        .find(|urls| !urls.is_empty())
        .unwrap_or_default()
}

fn urls_from_results(value: &Value) -> Vec<String> {
    urls_from_array(value.get("results"))
}

fn url_from_image_url(value: &Value) -> Vec<String> {
    match value.get("image_url").and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => vec![url.trim().to_string()],
        _ => Vec::new(),
    }
}

fn urls_from_data(value: &Value) -> Vec<String> {
    urls_from_array(value.get("data"))
}

fn urls_from_array(array: Option<&Value>) -> Vec<String> {
    array
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("url").and_then(Value::as_str))
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Normalized status token from an `output` object: `status`, `job_status`
/// or `task_status`, whichever is present, uppercased. Missing status yields
/// an empty string, which callers treat as "still pending".
pub fn status(output: &Value) -> String {
    ["status", "job_status", "task_status"]
        .iter()
        .find_map(|key| output.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_uppercase()
}

/// File identifier from an upload response: `data.uploaded_files[0].file_id`.
pub fn uploaded_file_id(response: &Value) -> Option<String> {
    response
        .get("data")?
        .get("uploaded_files")?
        .as_array()?
        .first()?
        .get("file_id")?
        .as_str()
        .map(str::to_string)
}

/// Job identifier from a fine-tune creation response: `output.job_id`.
pub fn fine_tune_job_id(response: &Value) -> Option<String> {
    response
        .get("output")?
        .get("job_id")?
        .as_str()
        .map(str::to_string)
}

/// Task identifier from a queued generation `output` object.
pub fn task_id(output: &Value) -> Option<String> {
    output.get("task_id")?.as_str().map(str::to_string)
}

/// Service-reported failure message from an `output` object.
pub fn error_message(output: &Value) -> Option<String> {
    output.get("error_msg")?.as_str().map(str::to_string)
}

/// Trained resource identifier from a succeeded fine-tune `output` object:
/// `finetuned_output`, falling back to `finetuned_resource_id`.
pub fn fine_tuned_resource_id(output: &Value) -> Option<String> {
    ["finetuned_output", "finetuned_resource_id"]
        .iter()
        .find_map(|key| output.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Image count reported by usage metrics (`usage.image_count`, falling back
/// to `task_metrics.TOTAL`), or `fallback` when neither is present.
pub fn reported_image_count(value: &Value, fallback: usize) -> usize {
    let from_usage = value
        .get("usage")
        .and_then(|usage| usage.get("image_count"))
        .and_then(Value::as_u64);
    let from_metrics = value
        .get("task_metrics")
        .and_then(|metrics| metrics.get("TOTAL"))
        .and_then(Value::as_u64);

    from_usage
        .or(from_metrics)
        .map(|count| count as usize)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_array_takes_priority() {
        let output = json!({
            "results": [{"url": "https://img/a.png"}, {"url": "https://img/b.png"}],
            "image_url": "https://img/ignored.png",
            "data": [{"url": "https://img/also-ignored.png"}],
        });
        assert_eq!(
            image_urls(&output),
            vec!["https://img/a.png", "https://img/b.png"]
        );
    }

    #[test]
    fn singular_image_url_beats_data_array() {
        let output = json!({
            "image_url": "https://img/single.png",
            "data": [{"url": "https://img/ignored.png"}],
        });
        assert_eq!(image_urls(&output), vec!["https://img/single.png"]);
    }

    #[test]
    fn data_array_is_the_last_resort() {
        let output = json!({"data": [{"url": "https://img/d.png"}]});
        assert_eq!(image_urls(&output), vec!["https://img/d.png"]);
    }

    #[test]
    fn urls_are_trimmed_and_empties_dropped() {
        let output = json!({"results": [{"url": "  https://img/a.png \n"}, {"url": "   "}]});
        assert_eq!(image_urls(&output), vec!["https://img/a.png"]);
    }

    #[test]
    fn whitespace_only_results_fall_through_to_next_strategy() {
        let output = json!({
            "results": [{"url": "  "}],
            "image_url": "https://img/fallback.png",
        });
        assert_eq!(image_urls(&output), vec!["https://img/fallback.png"]);
    }

    #[test]
    fn no_urls_anywhere_yields_empty() {
        assert!(image_urls(&json!({"task_id": "t-1"})).is_empty());
    }

    #[test]
    fn status_is_normalized_and_probes_alternate_keys() {
        assert_eq!(status(&json!({"status": "succeeded"})), "SUCCEEDED");
        assert_eq!(status(&json!({"job_status": "Running"})), "RUNNING");
        assert_eq!(status(&json!({"task_status": "FAILED"})), "FAILED");
        assert_eq!(status(&json!({})), "");
    }

    #[test]
    fn extracts_uploaded_file_id() {
        let response = json!({"data": {"uploaded_files": [{"file_id": "file-1"}, {"file_id": "file-2"}]}});
        assert_eq!(uploaded_file_id(&response).as_deref(), Some("file-1"));
        assert_eq!(uploaded_file_id(&json!({"data": {"uploaded_files": []}})), None);
    }

    #[test]
    fn extracts_job_and_task_ids() {
        assert_eq!(
            fine_tune_job_id(&json!({"output": {"job_id": "ft-1"}})).as_deref(),
            Some("ft-1")
        );
        assert_eq!(task_id(&json!({"task_id": "task-1"})).as_deref(), Some("task-1"));
        assert_eq!(task_id(&json!({})), None);
    }

    #[test]
    fn resource_id_falls_back_to_alternate_key() {
        assert_eq!(
            fine_tuned_resource_id(&json!({"finetuned_output": "res-1"})).as_deref(),
            Some("res-1")
        );
        assert_eq!(
            fine_tuned_resource_id(&json!({"finetuned_resource_id": "res-2"})).as_deref(),
            Some("res-2")
        );
        assert_eq!(fine_tuned_resource_id(&json!({"status": "SUCCEEDED"})), None);
    }

    #[test]
    fn image_count_probes_usage_then_metrics_then_fallback() {
        assert_eq!(reported_image_count(&json!({"usage": {"image_count": 4}}), 1), 4);
        assert_eq!(reported_image_count(&json!({"task_metrics": {"TOTAL": 3}}), 1), 3);
        assert_eq!(reported_image_count(&json!({}), 2), 2);
    }
}
