//! The vision/judgment capability behind the comparison engine.
//!
//! The engine only sees [`VisionClassifier`]; [`LlmVisionClassifier`] talks to an
//! OpenAI-compatible chat completions endpoint with the item's photos attached.

use async_trait::async_trait;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::VisionConfig;
use crate::core::error::{AppError, Result};
use crate::features::comparisons::models::{ChangeType, Classification, IssueSeverity};
use crate::features::inspections::models::ItemCondition;
use crate::shared::llm::{parse_structured, StructuredOutput};
use crate::shared::prompts::{render_classify_item_prompt, ClassifyItemPrompt};

/// One side (entry or exit) of an aligned item
#[derive(Debug, Clone, Default)]
pub struct ItemEvidence {
    pub room_name: String,
    pub condition: Option<ItemCondition>,
    pub notes: Option<String>,
    pub image_urls: Vec<String>,
}

impl ItemEvidence {
    pub fn has_images(&self) -> bool {
        !self.image_urls.is_empty()
    }
}

#[async_trait]
pub trait VisionClassifier: Send + Sync {
    /// Classify the change of one item between entry and exit.
    ///
    /// Unreachable services and malformed replies are `ExternalCapabilityFailure`.
    async fn classify(
        &self,
        entry: &ItemEvidence,
        exit: &ItemEvidence,
        item_name: &str,
    ) -> Result<Classification>;
}

/// Shape the model must reply with
#[derive(Debug, Deserialize, JsonSchema)]
struct ClassificationOutput {
    change_type: ChangeType,
    severity: IssueSeverity,
    /// Must be false for wear_and_tear
    is_tenant_responsible: bool,
    /// Between 0 and 1
    confidence: f64,
    /// Repair or replacement cost, not negative
    estimated_cost: f64,
    /// One sentence describing the change
    description: String,
    /// What in the photos or notes supports the classification
    evidence_notes: Option<String>,
}

impl StructuredOutput for ClassificationOutput {
    fn check(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if !self.estimated_cost.is_finite() || self.estimated_cost < 0.0 {
            return Err(format!("invalid estimated_cost {}", self.estimated_cost));
        }
        if self.description.trim().is_empty() {
            return Err("empty description".to_string());
        }
        Ok(())
    }
}

impl ClassificationOutput {
    fn into_classification(self) -> std::result::Result<Classification, String> {
        let estimated_cost = Decimal::from_f64_retain(self.estimated_cost)
            .map(|d| d.round_dp(2))
            .ok_or_else(|| format!("unrepresentable cost {}", self.estimated_cost))?;
        Ok(Classification {
            change_type: self.change_type,
            severity: self.severity,
            is_tenant_responsible: self.is_tenant_responsible,
            confidence: self.confidence,
            estimated_cost,
            description: self.description.trim().to_string(),
            evidence_notes: self.evidence_notes,
        }
        .normalized())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct LlmVisionClassifier {
    client: reqwest::Client,
    config: VisionConfig,
}

impl LlmVisionClassifier {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn failure(&self, item_name: &str, detail: impl std::fmt::Display) -> AppError {
        tracing::error!("Vision classification failed for '{}': {}", item_name, detail);
        AppError::ExternalCapabilityFailure(format!(
            "Vision classification failed for '{}': {}",
            item_name, detail
        ))
    }
}

#[async_trait]
impl VisionClassifier for LlmVisionClassifier {
    async fn classify(
        &self,
        entry: &ItemEvidence,
        exit: &ItemEvidence,
        item_name: &str,
    ) -> Result<Classification> {
        let schema = ClassificationOutput::json_schema_string();
        let prompt = render_classify_item_prompt(&ClassifyItemPrompt {
            room_name: &exit.room_name,
            item_name,
            entry_condition: entry.condition.map(|c| c.to_string()),
            exit_condition: exit
                .condition
                .map(|c| c.to_string())
                .unwrap_or_else(|| "not recorded".to_string()),
            entry_notes: entry.notes.as_deref(),
            exit_notes: exit.notes.as_deref(),
            entry_image_count: entry.image_urls.len(),
            exit_image_count: exit.image_urls.len(),
            json_schema: &schema,
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut content = vec![json!({ "type": "text", "text": prompt })];
        for url in entry.image_urls.iter().chain(exit.image_urls.iter()) {
            content.push(json!({ "type": "image_url", "image_url": { "url": url } }));
        }

        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [{ "role": "user", "content": content }],
        });

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        tracing::debug!("Classifying '{}' via {}", item_name, url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.failure(item_name, e))?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(self.failure(
                item_name,
                format!("HTTP {}: {}", status, text.chars().take(200).collect::<String>()),
            ));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| self.failure(item_name, e))?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.failure(item_name, "empty reply"))?;

        parse_structured::<ClassificationOutput>(&reply)
            .and_then(ClassificationOutput::into_classification)
            .map_err(|e| self.failure(item_name, e))
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic classifier: maps the exit condition to a fixed classification.
    /// Items listed in `failing` return `ExternalCapabilityFailure`.
    #[derive(Default)]
    pub struct FakeClassifier {
        pub failing: Mutex<Vec<String>>,
        pub overrides: HashMap<String, Classification>,
        pub calls: AtomicUsize,
    }

    impl FakeClassifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_on(&self, item_name: &str) {
            if let Ok(mut failing) = self.failing.lock() {
                failing.push(item_name.to_string());
            }
        }

        pub fn clear_failures(&self) {
            if let Ok(mut failing) = self.failing.lock() {
                failing.clear();
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn classification_for(condition: Option<ItemCondition>) -> Classification {
        let (change_type, severity, tenant, cost) = match condition {
            Some(ItemCondition::Missing) => (ChangeType::Missing, IssueSeverity::Major, true, 300),
            Some(ItemCondition::Damaged) => {
                (ChangeType::MajorDamage, IssueSeverity::Major, true, 450)
            }
            Some(ItemCondition::Poor) => {
                (ChangeType::MinorDamage, IssueSeverity::Moderate, true, 120)
            }
            _ => (ChangeType::WearAndTear, IssueSeverity::Minor, false, 40),
        };
        Classification {
            change_type,
            severity,
            is_tenant_responsible: tenant,
            confidence: 0.9,
            estimated_cost: Decimal::new(cost, 0),
            description: format!("{} change", change_type),
            evidence_notes: None,
        }
    }

    #[async_trait]
    impl VisionClassifier for FakeClassifier {
        async fn classify(
            &self,
            _entry: &ItemEvidence,
            exit: &ItemEvidence,
            item_name: &str,
        ) -> Result<Classification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failing
                .lock()
                .map(|f| f.iter().any(|n| n == item_name))
                .unwrap_or(false);
            if failing {
                return Err(AppError::ExternalCapabilityFailure(format!(
                    "vision service unavailable for {}",
                    item_name
                )));
            }
            Ok(self
                .overrides
                .get(item_name)
                .cloned()
                .unwrap_or_else(|| classification_for(exit.condition)))
        }
    }
}
