//! Single-shot brief generation without stages or checkpoints

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::outputs::{StageOutputKind, VideoBrief};
use crate::models::quick_brief::{QuickBrief, QuickBriefResult, QuickBriefStatus};
use crate::models::workflow::{StageName, WorkflowInput};
use crate::workflow::generation::{GenerationRequest, GenerationService};
use crate::workflow::invoker::{GenerationInvoker, GenerationOutcome};
use crate::workflow::locks::WorkflowLocks;
use crate::workflow::persistence::QuickBriefStore;
use std::sync::Arc;
use uuid::Uuid;

/// Creates briefs and generates each one in a single call, optionally
/// revising the previous result with feedback
pub struct QuickBriefEngine {
    store: Arc<dyn QuickBriefStore>,
    invoker: GenerationInvoker,
    locks: WorkflowLocks,
}

impl QuickBriefEngine {
    pub fn new(store: Arc<dyn QuickBriefStore>, service: Arc<dyn GenerationService>) -> Self {
        Self {
            store,
            invoker: GenerationInvoker::new(service),
            locks: WorkflowLocks::new(),
        }
    }

    async fn load(&self, id: Uuid) -> WorkflowResult<QuickBrief> {
        self.store
            .get_brief(id)
            .await?
            .ok_or(WorkflowError::BriefNotFound(id))
    }

    /// Create and persist a brief in `draft`
    pub async fn create_brief(&self, name: &str, input: WorkflowInput) -> WorkflowResult<QuickBrief> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("Brief name is required"));
        }
        input.validate()?;

        let mut brief = QuickBrief::new(name, input);
        self.store.save_brief(&mut brief).await?;

        tracing::info!(brief_id = %brief.id, "Created quick brief '{}'", brief.name);
        Ok(brief)
    }

    pub async fn get_brief(&self, id: Uuid) -> WorkflowResult<QuickBrief> {
        self.load(id).await
    }

    /// All briefs, most recently updated first
    pub async fn list_briefs(&self) -> WorkflowResult<Vec<QuickBrief>> {
        Ok(self.store.list_briefs().await?)
    }

    pub async fn delete_brief(&self, id: Uuid) -> WorkflowResult<()> {
        let _guard = self.locks.acquire(id).await;
        if !self.store.delete_brief(id).await? {
            return Err(WorkflowError::BriefNotFound(id));
        }
        tracing::info!(brief_id = %id, "Deleted quick brief");
        Ok(())
    }

    /// Generate the brief, or regenerate it from the previous result when
    /// feedback is given. A failed attempt keeps the previous brief.
    pub async fn generate_brief(
        &self,
        id: Uuid,
        feedback: Option<String>,
    ) -> WorkflowResult<QuickBriefResult> {
        let feedback = feedback
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let _guard = self.locks.acquire(id).await;
        let mut brief = self.load(id).await?;

        brief.status = QuickBriefStatus::Generating;
        brief.error = None;
        self.store.save_brief(&mut brief).await?;

        tracing::info!(brief_id = %id, revision = feedback.is_some(), "Generating quick brief");

        let request = GenerationRequest {
            workflow_id: id,
            stage: StageName::FullBrief,
            input: brief.input.clone(),
            prerequisites: Vec::new(),
            previous_output: brief.brief.clone().map(VideoBrief::into_output),
            feedback,
        };

        let outcome = match self.invoker.generate(&request).await {
            GenerationOutcome::Success(output) => match VideoBrief::from_output(&output) {
                Some(generated) => Ok(generated.clone()),
                None => Err(format!("Generation service returned {} output", output.stage())),
            },
            GenerationOutcome::Failure(reason) => Err(reason),
        };

        let result = match outcome {
            Ok(generated) => {
                brief.brief = Some(generated);
                brief.status = QuickBriefStatus::Ready;
                None
            }
            Err(reason) => {
                brief.status = QuickBriefStatus::Failed;
                brief.error = Some(reason.clone());
                Some(reason)
            }
        };

        if let Err(err) = self.store.save_brief(&mut brief).await {
            brief.status = QuickBriefStatus::Failed;
            brief.error = Some(format!("{:#}", err));
            if let Err(retry) = self.store.save_brief(&mut brief).await {
                tracing::error!(
                    brief_id = %id,
                    error = %format!("{:#}", retry),
                    "Failed to save quick brief result"
                );
            }
            return Err(err.into());
        }

        match result {
            None => {
                tracing::info!(brief_id = %id, "Quick brief ready");
                Ok(QuickBriefResult {
                    success: true,
                    workflow: brief,
                    error: None,
                })
            }
            Some(reason) => {
                tracing::warn!(brief_id = %id, error = %reason, "Quick brief generation failed");
                Ok(QuickBriefResult {
                    success: false,
                    workflow: brief,
                    error: Some(reason),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outputs::{fixtures, StageOutput};
    use crate::workflow::persistence::MemoryStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Returns numbered briefs until told to fail
    #[derive(Default)]
    struct BriefWriter {
        requests: Mutex<Vec<GenerationRequest>>,
        failing: AtomicBool,
    }

    #[async_trait]
    impl GenerationService for BriefWriter {
        async fn generate(&self, request: &GenerationRequest) -> Result<StageOutput> {
            let count = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow!("model overloaded"));
            }
            Ok(StageOutput::FullBrief(fixtures::video_brief(&format!(
                "Take {}",
                count
            ))))
        }
    }

    fn input() -> WorkflowInput {
        WorkflowInput {
            niche: "AI automation".to_string(),
            target_audience: "Agency owners".to_string(),
            business_goal: "Book calls".to_string(),
            ..WorkflowInput::default()
        }
    }

    fn engine(service: Arc<BriefWriter>) -> QuickBriefEngine {
        QuickBriefEngine::new(Arc::new(MemoryStore::new()), service)
    }

    fn title(brief: &QuickBrief) -> &str {
        &brief.brief.as_ref().unwrap().theme.title
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let engine = engine(Arc::new(BriefWriter::default()));
        assert!(engine.create_brief(" ", input()).await.unwrap_err().is_client_error());
        assert!(engine
            .create_brief("Launch", WorkflowInput::default())
            .await
            .unwrap_err()
            .is_client_error());
        assert!(engine.list_briefs().await.unwrap().is_empty());

        let brief = engine.create_brief(" Launch ", input()).await.unwrap();
        assert_eq!(brief.name, "Launch");
        assert_eq!(brief.status, QuickBriefStatus::Draft);
    }

    #[tokio::test]
    async fn test_generate_then_revise_with_feedback() {
        let service = Arc::new(BriefWriter::default());
        let engine = engine(service.clone());
        let id = engine.create_brief("Launch", input()).await.unwrap().id;

        let result = engine.generate_brief(id, None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.workflow.status, QuickBriefStatus::Ready);
        assert_eq!(title(&result.workflow), "Take 1");
        {
            let requests = service.requests.lock().unwrap();
            assert!(requests[0].prerequisites.is_empty());
            assert!(requests[0].previous_output.is_none());
        }

        let result = engine
            .generate_brief(id, Some("  punchier hook ".to_string()))
            .await
            .unwrap();
        assert_eq!(title(&result.workflow), "Take 2");

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[1].feedback.as_deref(), Some("punchier hook"));
        assert_eq!(
            requests[1].previous_output,
            Some(StageOutput::FullBrief(fixtures::video_brief("Take 1")))
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_brief() {
        let service = Arc::new(BriefWriter::default());
        let engine = engine(service.clone());
        let id = engine.create_brief("Launch", input()).await.unwrap().id;
        engine.generate_brief(id, None).await.unwrap();

        service.failing.store(true, Ordering::SeqCst);
        let result = engine
            .generate_brief(id, Some("shorter".to_string()))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("model overloaded"));

        let stored = engine.get_brief(id).await.unwrap();
        assert_eq!(stored.status, QuickBriefStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("model overloaded"));
        assert_eq!(title(&stored), "Take 1");

        service.failing.store(false, Ordering::SeqCst);
        let result = engine.generate_brief(id, None).await.unwrap();
        assert!(result.success);
        assert!(result.workflow.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_brief_is_not_found() {
        let service = Arc::new(BriefWriter::default());
        let engine = engine(service.clone());
        let id = Uuid::new_v4();

        assert!(matches!(engine.get_brief(id).await, Err(WorkflowError::BriefNotFound(_))));
        assert!(matches!(engine.delete_brief(id).await, Err(WorkflowError::BriefNotFound(_))));
        assert!(matches!(
            engine.generate_brief(id, None).await,
            Err(WorkflowError::BriefNotFound(_))
        ));
        assert!(service.requests.lock().unwrap().is_empty());
        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_brief() {
        let engine = engine(Arc::new(BriefWriter::default()));
        let id = engine.create_brief("Launch", input()).await.unwrap().id;
        engine.delete_brief(id).await.unwrap();
        assert!(engine.list_briefs().await.unwrap().is_empty());
    }
}
