use tracing::{info, warn};

use super::client::{GenerationRequest, InferenceClient};
use super::provider::{is_task_mismatch, ProviderError};
use crate::config::TaskOverride;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceTask {
    /// Raw text-generation endpoint.
    Generation,
    /// Chat-completions style invocation.
    Conversational,
}

impl InferenceTask {
    pub fn opposite(self) -> Self {
        match self {
            InferenceTask::Generation => InferenceTask::Conversational,
            InferenceTask::Conversational => InferenceTask::Generation,
        }
    }
}

/// Model families that only serve the text-generation task.
const GENERATION_ONLY: &[&str] = &["gpt2", "t5", "flan"];

/// Picks the invocation task for a model: explicit override wins, then a
/// known generation-only family match, then conversational.
pub fn select_task(model: &str, task_override: Option<TaskOverride>) -> InferenceTask {
    match task_override {
        Some(TaskOverride::Text) => return InferenceTask::Generation,
        Some(TaskOverride::Chat) => return InferenceTask::Conversational,
        None => {}
    }
    let lower = model.to_lowercase();
    if GENERATION_ONLY.iter().any(|m| lower.contains(m)) {
        InferenceTask::Generation
    } else {
        InferenceTask::Conversational
    }
}

/// Result of one provider call, separating "wrong task for this model" from
/// every other failure. Only the former is worth a second attempt.
pub enum InvocationOutcome {
    Success(String),
    TaskMismatch(ProviderError),
    Failure(ProviderError),
}

async fn invoke(
    client: &dyn InferenceClient,
    model: &str,
    task: InferenceTask,
    req: &GenerationRequest,
) -> InvocationOutcome {
    match client.generate(model, task, req).await {
        Ok(text) => InvocationOutcome::Success(text),
        Err(err) if is_task_mismatch(&err.details_text()) => InvocationOutcome::TaskMismatch(err),
        Err(err) => InvocationOutcome::Failure(err),
    }
}

/// Invokes the model with the selected task; on a task mismatch, retries
/// exactly once with the opposite task and returns that second outcome.
/// Plain failures (auth, rate limits, unavailability) are never retried here;
/// they are a caller concern, not a configuration mismatch.
pub async fn generate_with_fallback(
    client: &dyn InferenceClient,
    model: &str,
    task: InferenceTask,
    req: &GenerationRequest,
) -> Result<String, ProviderError> {
    match invoke(client, model, task, req).await {
        InvocationOutcome::Success(text) => Ok(text),
        InvocationOutcome::Failure(err) => Err(err),
        InvocationOutcome::TaskMismatch(err) => {
            let fallback = task.opposite();
            warn!(%model, ?task, ?fallback, error = %err, "task mismatch, retrying with opposite task");
            match invoke(client, model, fallback, req).await {
                InvocationOutcome::Success(text) => {
                    info!(%model, ?fallback, "fallback task succeeded");
                    Ok(text)
                }
                InvocationOutcome::TaskMismatch(err) | InvocationOutcome::Failure(err) => Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    use crate::inference::client::ScoredLabel;

    struct ScriptedClient {
        calls: Mutex<Vec<InferenceTask>>,
        outcomes: Mutex<Vec<Result<String, ProviderError>>>,
    }

    impl ScriptedClient {
        fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcomes: Mutex::new(outcomes),
            }
        }

        fn calls(&self) -> Vec<InferenceTask> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn classify_image(
            &self,
            _model: &str,
            _image: Bytes,
            _content_type: &str,
        ) -> Result<Vec<ScoredLabel>, ProviderError> {
            unimplemented!("not used in these tests")
        }

        async fn generate(
            &self,
            _model: &str,
            task: InferenceTask,
            _req: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(task);
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "coach".into(),
            prompt: "plan".into(),
            max_new_tokens: 100,
            temperature: 0.4,
        }
    }

    fn mismatch_error() -> ProviderError {
        ProviderError::http(
            400,
            "Model gpt2 is not supported for task conversational",
            None,
        )
    }

    #[test]
    fn override_beats_model_heuristic() {
        assert_eq!(
            select_task("meta-llama/Llama-3-8B", Some(TaskOverride::Text)),
            InferenceTask::Generation
        );
        assert_eq!(
            select_task("gpt2", Some(TaskOverride::Chat)),
            InferenceTask::Conversational
        );
    }

    #[test]
    fn generation_only_families_are_recognized() {
        for model in ["gpt2", "openai-community/GPT2-large", "google/flan-t5-xl"] {
            assert_eq!(select_task(model, None), InferenceTask::Generation);
        }
        assert_eq!(
            select_task("mistralai/Mistral-7B-Instruct", None),
            InferenceTask::Conversational
        );
    }

    #[tokio::test]
    async fn mismatch_retries_opposite_task_once() {
        let client = ScriptedClient::new(vec![
            Err(mismatch_error()),
            Ok("{\"summary\": \"ok\"}".into()),
        ]);
        let text =
            generate_with_fallback(&client, "gpt2", InferenceTask::Conversational, &request())
                .await
                .unwrap();
        assert_eq!(text, "{\"summary\": \"ok\"}");
        assert_eq!(
            client.calls(),
            vec![InferenceTask::Conversational, InferenceTask::Generation]
        );
    }

    #[tokio::test]
    async fn second_mismatch_is_final() {
        let client = ScriptedClient::new(vec![Err(mismatch_error()), Err(mismatch_error())]);
        let err = generate_with_fallback(&client, "gpt2", InferenceTask::Generation, &request())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
        // Exactly two attempts, never a third.
        assert_eq!(
            client.calls(),
            vec![InferenceTask::Generation, InferenceTask::Conversational]
        );
    }

    #[tokio::test]
    async fn plain_failures_are_not_retried() {
        let client = ScriptedClient::new(vec![Err(ProviderError::http(429, "rate limited", None))]);
        let err = generate_with_fallback(&client, "m", InferenceTask::Conversational, &request())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(client.calls(), vec![InferenceTask::Conversational]);
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let client = ScriptedClient::new(vec![Ok("text".into())]);
        let text = generate_with_fallback(&client, "m", InferenceTask::Generation, &request())
            .await
            .unwrap();
        assert_eq!(text, "text");
        assert_eq!(client.calls(), vec![InferenceTask::Generation]);
    }
}
