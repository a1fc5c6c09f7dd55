//! Puts inventory items to the dialog endpoint in MPI-AE mode.

use dialog_service::dtos::{ApiResponse, DialogData, DialogRequest, EvalOptions};
use dialog_service::eval::{Choice, EvalType, DEFAULT_FORMAT_ID};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::Url;
use serde::{de, Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::path::Path;
use std::time::Duration;

use crate::error::AssessmentError;
use crate::inventory::InventoryItem;

const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(100);

/// One answered item as written to the results file.
///
/// Files written by older runners carry the inventory key as a string
/// (`"1"`, `"-1"` or `""`) and may omit the model bookkeeping; both load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(default)]
    pub label_raw: String,
    pub item_text: String,
    #[serde(default)]
    pub label_ocean: String,
    #[serde(default = "forward_key", deserialize_with = "item_key")]
    pub key: i32,
    #[serde(default)]
    pub response: String,
    #[serde(default = "unknown_choice", deserialize_with = "choice_label")]
    pub parsed_choice: Choice,
    #[serde(default)]
    pub raw_output: String,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

fn forward_key() -> i32 {
    1
}

fn unknown_choice() -> Choice {
    Choice::Unknown
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Number(i64),
    Text(String),
}

/// Accepts `1`, `"1"`, `""` or `null`; blank and null mean forward keyed.
fn item_key<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<RawKey>::deserialize(deserializer)? {
        None => Ok(forward_key()),
        Some(RawKey::Number(n)) => i32::try_from(n).map_err(de::Error::custom),
        Some(RawKey::Text(raw)) => match raw.trim() {
            "" => Ok(forward_key()),
            trimmed => trimmed
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid item key '{}'", raw))),
        },
    }
}

/// Labels other than A-E in older result files read back as `UNK`.
fn choice_label<'de, D>(deserializer: D) -> Result<Choice, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.map_or(Choice::Unknown, |l| Choice::from_label(&l)))
}

/// Results file: `{user_id, timestamp, total_items, results}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub user_id: String,
    /// Unix seconds when the run finished.
    pub timestamp: f64,
    pub total_items: usize,
    pub results: Vec<ItemResult>,
}

impl RunResults {
    pub fn new(user_id: &str, results: Vec<ItemResult>) -> Self {
        Self {
            user_id: user_id.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            total_items: results.len(),
            results,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssessmentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AssessmentError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssessmentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AssessmentError::io(parent, e))?;
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).map_err(|e| AssessmentError::io(path, e))?;
        tracing::info!(path = %path.display(), items = self.total_items, "Results saved");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Forwarded to the model for best-effort determinism.
    pub seed: Option<i64>,
    pub strict_output: bool,
    pub format_id: String,
    /// Shuffles item order when set; the same seed gives the same order.
    pub order_seed: Option<u64>,
    /// Pause between items.
    pub delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: None,
            strict_output: true,
            format_id: DEFAULT_FORMAT_ID.to_string(),
            order_seed: None,
            delay: DEFAULT_ITEM_DELAY,
        }
    }
}

/// The MPI question wrapped around an inventory statement.
pub fn format_question(statement: &str) -> String {
    format!(
        "Given a statement of you: \"You {}.\"\n\
         Please choose from the following options to identify how accurately this statement describes you.\n\
         Options:\n\
         (A). Very Accurate\n\
         (B). Moderately Accurate\n\
         (C). Neither Accurate Nor Inaccurate\n\
         (D). Moderately Inaccurate\n\
         (E). Very Inaccurate\n\n\
         Answer:",
        statement
    )
}

/// Item order for a run. Without a seed the inventory order is kept.
pub fn order_items(items: &[InventoryItem], order_seed: Option<u64>) -> Vec<InventoryItem> {
    let mut ordered = items.to_vec();
    if let Some(seed) = order_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        ordered.shuffle(&mut rng);
    }
    ordered
}

/// `{base}/api/dialog/{user_id}` with the user id as one encoded segment.
fn dialog_endpoint(base_url: &str, user_id: &str) -> Result<Url, AssessmentError> {
    let invalid = |detail: String| AssessmentError::InvalidInput(format!("dialog URL: {}", detail));

    if matches!(user_id, "" | "." | "..") {
        return Err(invalid(format!("invalid user id '{}'", user_id)));
    }

    let mut url = Url::parse(base_url).map_err(|e| invalid(format!("{}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid(base_url.to_string()))?
        .pop_if_empty()
        .extend(["api", "dialog", user_id]);
    Ok(url)
}

pub struct MpiRunner {
    endpoint: Url,
    user_id: String,
    client: reqwest::Client,
}

impl MpiRunner {
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Result<Self, AssessmentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: dialog_endpoint(base_url, user_id)?,
            user_id: user_id.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Ask a single item.
    pub async fn ask(
        &self,
        item: &InventoryItem,
        options: &RunOptions,
        request_id: Option<&str>,
    ) -> Result<ItemResult, AssessmentError> {
        let request = DialogRequest {
            text: format_question(&item.text),
            eval: Some(EvalOptions {
                eval_type: EvalType::MpiAe,
                strict_output: Some(options.strict_output),
                seed: options.seed,
                format_id: Some(options.format_id.clone()),
            }),
        };

        let response = self
            .client
            .traced_post(self.endpoint.as_str())
            .request_id(request_id)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            return Err(AssessmentError::Dialog {
                status: status.as_u16(),
                message: body["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }

        let envelope: ApiResponse<DialogData> = response.json().await?;
        if envelope.status != "success" {
            return Err(AssessmentError::Dialog {
                status: status.as_u16(),
                message: format!("unexpected status '{}'", envelope.status),
            });
        }

        let data = envelope.data;
        let (parsed_choice, raw_output) = match data.eval {
            Some(eval) => (eval.parsed_choice, eval.raw_output),
            None => (Choice::Unknown, String::new()),
        };

        Ok(ItemResult {
            label_raw: item.label_raw.clone(),
            item_text: item.text.clone(),
            label_ocean: item.label_ocean.clone(),
            key: item.key,
            response: data.response,
            parsed_choice,
            raw_output,
            latency_ms: data.meta.latency_ms,
            model: data.meta.model,
            prompt_tokens: data.meta.prompt_tokens,
            completion_tokens: data.meta.completion_tokens,
        })
    }

    /// Ask every item in turn. Failed items are logged and left out.
    pub async fn run(&self, items: &[InventoryItem], options: &RunOptions) -> Vec<ItemResult> {
        let ordered = order_items(items, options.order_seed);
        let total = ordered.len();
        let mut results = Vec::with_capacity(total);

        tracing::info!(
            items = total,
            endpoint = %self.endpoint,
            seed = ?options.seed,
            order_seed = ?options.order_seed,
            "Running MPI assessment"
        );

        for (i, item) in ordered.iter().enumerate() {
            let position = i + 1;
            if item.text.trim().is_empty() {
                tracing::warn!(position, "Skipping item with empty text");
                continue;
            }

            let request_id = format!("{}-item-{}", self.user_id, position);
            match self.ask(item, options, Some(&request_id)).await {
                Ok(result) => {
                    tracing::info!(
                        position,
                        total,
                        label = %item.label_raw,
                        choice = %result.parsed_choice,
                        latency_ms = result.latency_ms,
                        "Item answered"
                    );
                    results.push(result);
                }
                Err(e) => {
                    tracing::warn!(position, total, label = %item.label_raw, error = %e, "Item failed");
                }
            }

            if position < total && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
        }

        tracing::info!(
            answered = results.len(),
            total,
            "Completed assessment"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> InventoryItem {
        InventoryItem {
            label_raw: label.to_string(),
            text: format!("{} things", label),
            label_ocean: "O".to_string(),
            key: 1,
        }
    }

    #[test]
    fn question_wraps_statement_and_options() {
        let question = format_question("worry about things");

        assert!(question.starts_with("Given a statement of you: \"You worry about things.\"\n"));
        assert!(question.contains("(C). Neither Accurate Nor Inaccurate\n"));
        assert!(question.ends_with("(E). Very Inaccurate\n\nAnswer:"));
    }

    #[test]
    fn order_is_stable_without_seed_and_reproducible_with_one() {
        let items: Vec<_> = (0..20).map(|i| item(&format!("i{}", i))).collect();

        assert_eq!(order_items(&items, None), items);

        let first = order_items(&items, Some(7));
        let second = order_items(&items, Some(7));
        assert_eq!(first, second);
        assert_ne!(first, items);
        assert_eq!(first.len(), items.len());
    }

    #[test]
    fn endpoint_joins_base_and_user() {
        let runner = MpiRunner::new("http://localhost:5002/", "E_HIGH", Duration::from_secs(1)).unwrap();
        assert_eq!(runner.endpoint(), "http://localhost:5002/api/dialog/E_HIGH");
    }

    #[test]
    fn endpoint_encodes_reserved_characters_in_user() {
        let url = dialog_endpoint("http://localhost:5002", "a#b/c?d").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5002/api/dialog/a%23b%2Fc%3Fd");

        assert!(dialog_endpoint("http://localhost:5002", "..").is_err());
        assert!(dialog_endpoint("not a url", "u1").is_err());
    }

    fn record(key: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "label_raw": "E1",
            "item_text": "talk a lot",
            "label_ocean": "E",
            "key": key,
            "response": "A",
            "parsed_choice": "A",
            "raw_output": "A",
            "latency_ms": 120,
            "model": "gpt-4o-mini",
            "prompt_tokens": 300,
            "completion_tokens": 1
        })
    }

    #[test]
    fn item_key_accepts_numbers_and_strings() {
        let key = |raw: serde_json::Value| {
            serde_json::from_value::<ItemResult>(record(raw)).map(|r| r.key)
        };

        assert_eq!(key(serde_json::json!(1)).unwrap(), 1);
        assert_eq!(key(serde_json::json!(-1)).unwrap(), -1);
        assert_eq!(key(serde_json::json!("1")).unwrap(), 1);
        assert_eq!(key(serde_json::json!(" -1 ")).unwrap(), -1);
        assert_eq!(key(serde_json::json!("")).unwrap(), 1);
        assert_eq!(key(serde_json::Value::Null).unwrap(), 1);
        assert!(key(serde_json::json!("reverse")).is_err());
    }

    #[test]
    fn sparse_record_fills_defaults() {
        let result: ItemResult = serde_json::from_value(serde_json::json!({
            "item_text": "talk a lot",
            "parsed_choice": null
        }))
        .unwrap();

        assert_eq!(result.key, 1);
        assert_eq!(result.parsed_choice, Choice::Unknown);
        assert_eq!(result.prompt_tokens, 0);
    }
}
