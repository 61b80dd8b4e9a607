//! Utterance classification.
//!
//! Two strategies: keyword rules (always available) and a model-assisted pass through the
//! structured-classification collaborator. When the model pass is selected but fails,
//! times out, or returns something unusable, the rules take over.

mod model;
mod rules;

pub use model::{
    details_from_json, extract_json_object, parse_classification, required_detail, ModelClassifier,
};
pub use rules::RuleClassifier;

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::StructuredClassifier;
use crate::config::ClassifierConfig;
use crate::types::{ClassificationResult, ClassifierStrategy};

pub struct Classifier {
    strategy: ClassifierStrategy,
    rules: RuleClassifier,
    model: Option<ModelClassifier>,
    timeout: Duration,
}

impl Classifier {
    pub fn rule_based() -> Self {
        Self::new(&ClassifierConfig::default(), None)
    }

    pub fn new(config: &ClassifierConfig, service: Option<Arc<dyn StructuredClassifier>>) -> Self {
        if config.strategy == ClassifierStrategy::ModelAssisted && service.is_none() {
            tracing::warn!(
                target: "herald::classifier",
                "model-assisted strategy configured without a classification service; using rules"
            );
        }
        Self {
            strategy: config.strategy,
            rules: RuleClassifier::new(),
            model: service.map(ModelClassifier::new),
            timeout: config.timeout(),
        }
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    /// Never fails; the returned task is always routable.
    pub async fn classify(&self, utterance: &str) -> ClassificationResult {
        if self.strategy == ClassifierStrategy::ModelAssisted {
            if let Some(model) = &self.model {
                match tokio::time::timeout(self.timeout, model.classify(utterance)).await {
                    Ok(result) if result.valid => {
                        tracing::debug!(
                            target: "herald::classifier",
                            category = %result.task.category,
                            "model-assisted classification"
                        );
                        return result;
                    }
                    Ok(result) => {
                        tracing::warn!(
                            target: "herald::classifier",
                            reason = result.reason.as_deref().unwrap_or("unknown"),
                            "model classification invalid; falling back to rules"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            target: "herald::classifier",
                            timeout_ms = self.timeout.as_millis() as u64,
                            "model classification timed out; falling back to rules"
                        );
                    }
                }
            }
        }
        self.rules.classify(utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::types::TaskCategory;

    struct Scripted(Result<String, CollaboratorError>);

    #[async_trait::async_trait]
    impl StructuredClassifier for Scripted {
        async fn classify(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl StructuredClassifier for Stalled {
        async fn classify(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            std::future::pending().await
        }
    }

    fn model_assisted(service: Arc<dyn StructuredClassifier>) -> Classifier {
        let cfg = ClassifierConfig {
            strategy: ClassifierStrategy::ModelAssisted,
            timeout_ms: 50,
        };
        Classifier::new(&cfg, Some(service))
    }

    #[tokio::test]
    async fn model_answer_is_used_when_valid() {
        let c = model_assisted(Arc::new(Scripted(Ok(
            r#"{"type":"TODO","details":{"query":"water the plants"}}"#.into(),
        ))));
        let r = c.classify("don't let me forget the plants").await;
        assert_eq!(r.strategy, ClassifierStrategy::ModelAssisted);
        assert_eq!(r.task.category, TaskCategory::Todo);
    }

    #[tokio::test]
    async fn malformed_model_answer_falls_back_to_rules() {
        let c = model_assisted(Arc::new(Scripted(Ok("I think it's weather".into()))));
        let r = c.classify("weather in Lima").await;
        assert!(r.valid);
        assert_eq!(r.strategy, ClassifierStrategy::RuleBased);
        assert_eq!(r.task.detail("query"), Some("Lima"));
    }

    #[tokio::test]
    async fn service_error_falls_back_to_rules() {
        let c = model_assisted(Arc::new(Scripted(Err(CollaboratorError::Timeout))));
        let r = c.classify("search for tide tables").await;
        assert_eq!(r.task.category, TaskCategory::WebSearch);
    }

    #[tokio::test]
    async fn stalled_model_is_bounded_by_timeout() {
        let c = model_assisted(Arc::new(Stalled));
        let started = std::time::Instant::now();
        let r = c.classify("weather in Quito").await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(r.task.category, TaskCategory::Weather);
    }

    #[tokio::test]
    async fn rule_based_default() {
        let c = Classifier::rule_based();
        assert_eq!(c.strategy(), ClassifierStrategy::RuleBased);
        assert_eq!(c.classify("hello there").await.task.category, TaskCategory::Conversation);
    }
}
