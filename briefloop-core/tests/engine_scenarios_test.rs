use anyhow::{anyhow, Result};
use async_trait::async_trait;
use briefloop_core::models::{
    ControlLevel, StageName, StageOutput, StageStatus, VideoBrief, WorkflowInput, WorkflowState,
    WorkflowStatus,
};
use briefloop_core::workflow::{
    GenerationRequest, GenerationService, JsonFileStore, MemoryStore, StageAction, WorkflowEngine,
    WorkflowStore,
};
use briefloop_core::WorkflowError;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use uuid::Uuid;

/// Generation service whose behaviour each test scripts per stage
#[derive(Default)]
struct ScriptedService {
    requests: Mutex<Vec<GenerationRequest>>,
    failing: Mutex<HashSet<StageName>>,
    panicking: Mutex<HashSet<StageName>>,
    delay: Option<Duration>,
}

impl ScriptedService {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn fail(&self, stage: StageName) {
        self.failing.lock().unwrap().insert(stage);
    }

    fn recover(&self, stage: StageName) {
        self.failing.lock().unwrap().remove(&stage);
    }

    fn panic_on(&self, stage: StageName) {
        self.panicking.lock().unwrap().insert(stage);
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, request: &GenerationRequest) -> Result<StageOutput> {
        let attempt = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.iter().filter(|r| r.stage == request.stage).count()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.lock().unwrap().contains(&request.stage) {
            panic!("scripted panic in {}", request.stage);
        }
        if self.failing.lock().unwrap().contains(&request.stage) {
            return Err(anyhow!("{} generation failed", request.stage));
        }

        Ok(sample_output(request.stage, attempt))
    }
}

fn sample_output(stage: StageName, attempt: usize) -> StageOutput {
    let value = match stage {
        StageName::TopicResearch => json!({
            "topic": "Client onboarding automation",
            "title": format!("I automated onboarding (take {})", attempt),
            "angle": "No-code, under five minutes",
            "whyNow": "Agencies are drowning in admin",
            "targetViewer": "Agency owners",
            "problemSolved": "Manual onboarding",
            "whatWereBuildingName": "Client Onboarding Bot",
            "whatWereBuildingDescription": "Collects client details and sets up projects",
            "toolsNeeded": ["ChatGPT", "Make.com"],
            "alternativeTopics": [{"topic": "Invoice chaser", "angle": "Get paid faster"}]
        }),
        StageName::ScriptOutline => json!({
            "title": "I automated onboarding",
            "hook": "This bot onboards clients while I sleep",
            "totalLength": "4:00",
            "sections": [{
                "timestamp": "0:00",
                "duration": "15 seconds",
                "sectionType": "hook",
                "purpose": "Show the result",
                "keyPoints": ["Finished bot"],
                "whatToShow": "Bot demo"
            }],
            "buildOverview": ["Create the form", "Connect the model"]
        }),
        StageName::FullBrief => json!({
            "theme": {
                "title": format!("Brief v{}", attempt),
                "hook": "This bot onboards clients while I sleep",
                "problemSolved": "Manual onboarding",
                "targetViewer": "Agency owners",
                "videoLength": "4:00"
            },
            "tutorial": {
                "toolName": "Client Onboarding Bot",
                "whatItDoes": "Onboards clients",
                "toolsUsed": ["ChatGPT"],
                "difficultyLevel": "beginner"
            },
            "script": [{
                "timestamp": "0:00",
                "type": "hook",
                "script": "Watch this.",
                "onScreen": "Bot running"
            }],
            "buildSteps": [{
                "stepNumber": 1,
                "title": "Create the form",
                "action": "Open the form builder",
                "exactInstructions": "Add name and email fields",
                "whatToShow": "Form builder",
                "whatToSay": "First, the form."
            }],
            "assets": {
                "thumbnail": {"text": "Onboarding on autopilot", "visualDescription": "Robot"},
                "screenRecordings": ["Form builder"],
                "bRoll": [],
                "graphics": []
            },
            "cta": {"verbalCta": "Book a call", "descriptionText": "Links below"}
        }),
    };
    StageOutput::from_json(stage, value).unwrap()
}

fn input() -> WorkflowInput {
    WorkflowInput {
        niche: "AI automation".to_string(),
        target_audience: "Agency owners".to_string(),
        business_goal: "Sell automation consulting".to_string(),
        topic_idea: Some("Onboarding bots".to_string()),
        ..WorkflowInput::default()
    }
}

/// Memory store whose `fail_on`-th save (1-based) returns an error
struct FlakyStore {
    inner: MemoryStore,
    saves: AtomicUsize,
    fail_on: usize,
}

impl FlakyStore {
    fn failing_on(fail_on: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            saves: AtomicUsize::new(0),
            fail_on,
        })
    }
}

#[async_trait]
impl WorkflowStore for FlakyStore {
    async fn save(&self, workflow: &mut WorkflowState) -> Result<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(anyhow!("disk hiccup"));
        }
        self.inner.save(workflow).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<WorkflowState>> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<WorkflowState>> {
        self.inner.list().await
    }
}

fn engine_with(service: Arc<ScriptedService>) -> WorkflowEngine {
    WorkflowEngine::new(Arc::new(MemoryStore::new()), service)
}

async fn create(engine: &WorkflowEngine, level: ControlLevel) -> Uuid {
    engine
        .create_workflow("Launch video", input(), level)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_checkpoint_then_auto_approved_stage() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    let result = engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.requires_approval);
    assert_eq!(result.workflow.status, WorkflowStatus::Paused);
    assert_eq!(
        result.workflow.stage(StageName::TopicResearch).status,
        StageStatus::AwaitingApproval
    );
    assert_eq!(result.workflow.current_stage, Some(StageName::TopicResearch));

    let result = engine
        .approve_stage(id, StageName::TopicResearch, true)
        .await
        .unwrap();
    assert!(result.success);
    assert!(!result.requires_approval);
    let workflow = result.workflow;
    assert_eq!(
        workflow.stage(StageName::TopicResearch).status,
        StageStatus::Approved
    );
    assert_eq!(
        workflow.stage(StageName::ScriptOutline).status,
        StageStatus::Approved
    );
    assert_eq!(workflow.stage(StageName::FullBrief).status, StageStatus::Pending);
    assert_eq!(workflow.status, WorkflowStatus::Paused);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn test_autopilot_pipeline_runs_to_completion() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Autopilot).await;

    let result = engine.run_pipeline(id, None).await.unwrap();

    assert!(result.success);
    assert!(!result.requires_approval);
    assert_eq!(result.workflow.status, WorkflowStatus::Completed);
    assert_eq!(result.workflow.current_stage, None);
    for (_, execution) in result.workflow.stages.iter() {
        assert_eq!(execution.status, StageStatus::Approved);
        assert_eq!(execution.attempts, 1);
        assert!(execution.output.is_some());
    }
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn test_failure_after_approved_stage() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    service.fail(StageName::ScriptOutline);

    let result = engine
        .approve_stage(id, StageName::TopicResearch, true)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("script-outline generation failed"));
    let workflow = engine.get_workflow(id).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Failed);
    assert_eq!(workflow.error.as_deref(), Some("script-outline generation failed"));
    assert_eq!(workflow.current_stage, Some(StageName::ScriptOutline));
    assert_eq!(
        workflow.stage(StageName::ScriptOutline).status,
        StageStatus::Pending
    );
    assert_eq!(
        workflow.stage(StageName::TopicResearch).status,
        StageStatus::Approved
    );

    // The next attempt clears the error
    service.recover(StageName::ScriptOutline);
    let result = engine.continue_pipeline(id).await.unwrap();
    assert!(result.success);
    assert_eq!(result.workflow.error, None);
    assert_eq!(result.workflow.stage(StageName::ScriptOutline).attempts, 2);
}

#[tokio::test]
async fn test_continue_on_completed_workflow_skips_generation() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Autopilot).await;
    engine.run_pipeline(id, None).await.unwrap();
    assert_eq!(service.calls(), 3);

    let result = engine.continue_pipeline(id).await.unwrap();

    assert!(result.success);
    assert_eq!(result.workflow.status, WorkflowStatus::Completed);
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn test_attempts_increment_on_success_and_failure() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::FullControl).await;

    let result = engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    assert_eq!(result.workflow.stage(StageName::TopicResearch).attempts, 1);

    service.fail(StageName::TopicResearch);
    let result = engine
        .rerun_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.workflow.stage(StageName::TopicResearch).attempts, 2);

    // Out-of-order runs fail in the invoker but still count
    let result = engine
        .run_stage(id, StageName::FullBrief, None)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Cannot run full-brief: no output yet from script-outline")
    );
    assert_eq!(result.workflow.stage(StageName::FullBrief).attempts, 1);
}

#[tokio::test]
async fn test_failed_run_keeps_previous_output() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    let first = engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    let output = first.workflow.stage(StageName::TopicResearch).output.clone();
    assert!(output.is_some());

    service.fail(StageName::TopicResearch);
    let result = engine
        .rerun_stage(id, StageName::TopicResearch, Some("sharper angle".to_string()))
        .await
        .unwrap();

    assert!(!result.success);
    let execution = result.workflow.stage(StageName::TopicResearch);
    assert_eq!(execution.status, StageStatus::Pending);
    assert_eq!(execution.output, output);
    assert_eq!(service.last_request().previous_output, output);
}

#[tokio::test]
async fn test_panicking_service_marks_workflow_failed() {
    let service = ScriptedService::new();
    service.panic_on(StageName::TopicResearch);
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    let result = engine.run_pipeline(id, None).await.unwrap();

    assert!(!result.success);
    let workflow = engine.get_workflow(id).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Failed);
    assert_eq!(
        workflow.stage(StageName::TopicResearch).status,
        StageStatus::Pending
    );
    assert!(workflow.error.unwrap().contains("panicked"));
}

#[tokio::test]
async fn test_reject_requires_feedback_before_any_mutation() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;
    engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();
    let before = engine.get_workflow(id).await.unwrap();

    let err = engine
        .reject_stage(id, StageName::TopicResearch, "   ")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Validation(_)));
    assert_eq!(engine.get_workflow(id).await.unwrap(), before);
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_reject_regenerates_with_feedback() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;
    let first = engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .unwrap();

    let result = engine
        .apply_stage_action(
            id,
            StageName::TopicResearch,
            StageAction::Reject {
                feedback: "Make it about invoicing".to_string(),
            },
        )
        .await
        .unwrap();

    let request = service.last_request();
    assert_eq!(request.feedback.as_deref(), Some("Make it about invoicing"));
    assert_eq!(
        request.previous_output,
        first.workflow.stage(StageName::TopicResearch).output
    );
    assert!(request.is_revision());

    let execution = result.workflow.stage(StageName::TopicResearch);
    assert_eq!(execution.status, StageStatus::AwaitingApproval);
    assert_eq!(execution.feedback.as_deref(), Some("Make it about invoicing"));
    assert_eq!(execution.attempts, 2);

    let approved = engine
        .approve_stage(id, StageName::TopicResearch, false)
        .await
        .unwrap();
    assert_eq!(
        approved.workflow.stage(StageName::TopicResearch).feedback,
        None
    );
    assert_eq!(approved.workflow.status, WorkflowStatus::Paused);
}

#[tokio::test]
async fn test_approving_final_stage_completes_regardless_of_continue() {
    for continue_to_next in [true, false] {
        let engine = engine_with(ScriptedService::new());
        let id = create(&engine, ControlLevel::FullControl).await;

        for stage in [StageName::TopicResearch, StageName::ScriptOutline] {
            engine.run_stage(id, stage, None).await.unwrap();
            engine.approve_stage(id, stage, false).await.unwrap();
        }
        let result = engine
            .run_stage(id, StageName::FullBrief, None)
            .await
            .unwrap();
        assert!(result.requires_approval);
        assert_eq!(result.workflow.current_stage, Some(StageName::FullBrief));

        let result = engine
            .approve_stage(id, StageName::FullBrief, continue_to_next)
            .await
            .unwrap();
        assert_eq!(result.workflow.status, WorkflowStatus::Completed);
        assert_eq!(result.workflow.current_stage, None);
    }
}

#[tokio::test]
async fn test_checkpoint_pipeline_pauses_and_resumes() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    let result = engine.run_pipeline(id, None).await.unwrap();
    assert!(result.requires_approval);
    assert_eq!(service.calls(), 1);

    engine
        .approve_stage(id, StageName::TopicResearch, false)
        .await
        .unwrap();
    let result = engine.continue_pipeline(id).await.unwrap();

    assert!(result.requires_approval);
    assert_eq!(result.workflow.current_stage, Some(StageName::FullBrief));
    assert_eq!(
        result.workflow.stage(StageName::ScriptOutline).status,
        StageStatus::Approved
    );
    assert_eq!(
        result.workflow.stage(StageName::FullBrief).status,
        StageStatus::AwaitingApproval
    );
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn test_saved_briefs_are_prepended_and_survive_reset() {
    let engine = engine_with(ScriptedService::new());
    let id = create(&engine, ControlLevel::Autopilot).await;

    let err = engine.save_brief(id, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    engine.run_pipeline(id, None).await.unwrap();
    let (first, _) = engine.save_brief(id, None).await.unwrap();
    assert_eq!(first.name.as_deref(), Some("Brief v1"));
    assert_eq!(first.topic_idea.as_deref(), Some("Onboarding bots"));

    engine
        .rerun_stage(id, StageName::FullBrief, None)
        .await
        .unwrap();
    let (second, workflow) = engine
        .save_brief(id, Some("Second cut".to_string()))
        .await
        .unwrap();
    assert_eq!(workflow.saved_briefs[0].id, second.id);
    assert_eq!(workflow.saved_briefs[1].id, first.id);
    assert_eq!(workflow.saved_briefs[0].brief.theme.title, "Brief v2");

    let reset = engine.reset_workflow(id).await.unwrap();
    assert_eq!(reset.status, WorkflowStatus::Draft);
    assert!(reset.output::<VideoBrief>().is_none());
    for (_, execution) in reset.stages.iter() {
        assert_eq!(execution.status, StageStatus::Pending);
        assert_eq!(execution.attempts, 0);
    }
    assert_eq!(reset.saved_briefs.len(), 2);

    let workflow = engine.delete_saved_brief(id, Uuid::new_v4()).await.unwrap();
    assert_eq!(workflow.saved_briefs.len(), 2);
    let workflow = engine.delete_saved_brief(id, first.id).await.unwrap();
    assert_eq!(workflow.saved_briefs.len(), 1);
    assert_eq!(workflow.saved_briefs[0].id, second.id);
}

#[tokio::test]
async fn test_unknown_workflow_is_not_found_everywhere() {
    let service = ScriptedService::new();
    let engine = engine_with(service.clone());
    let id = Uuid::new_v4();
    let stage = StageName::TopicResearch;

    let results = vec![
        engine.get_workflow(id).await.err(),
        engine.delete_workflow(id).await.err(),
        engine.update_topic(id, None).await.err(),
        engine.reset_workflow(id).await.err(),
        engine.run_stage(id, stage, None).await.err(),
        engine.approve_stage(id, stage, true).await.err(),
        engine.reject_stage(id, stage, "feedback").await.err(),
        engine.rerun_stage(id, stage, None).await.err(),
        engine.run_pipeline(id, None).await.err(),
        engine.continue_pipeline(id).await.err(),
        engine.save_brief(id, None).await.err(),
        engine.delete_saved_brief(id, Uuid::new_v4()).await.err(),
    ];

    for err in results {
        assert!(matches!(err, Some(WorkflowError::NotFound(missing)) if missing == id));
    }
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_on_one_workflow_do_not_lose_updates() {
    let service = ScriptedService::slow(Duration::from_millis(20));
    let engine = Arc::new(engine_with(service.clone()));
    let id = create(&engine, ControlLevel::FullControl).await;

    let runs: Vec<_> = (0..3)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .run_stage(id, StageName::TopicResearch, None)
                    .await
                    .unwrap()
            })
        })
        .collect();
    for run in runs {
        assert!(run.await.unwrap().success);
    }

    let workflow = engine.get_workflow(id).await.unwrap();
    assert_eq!(workflow.stage(StageName::TopicResearch).attempts, 3);
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn test_json_store_survives_engine_restart() {
    let dir = tempdir().unwrap();
    let id = {
        let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
        let engine = WorkflowEngine::new(store, ScriptedService::new());
        let id = create(&engine, ControlLevel::Autopilot).await;
        engine.run_pipeline(id, None).await.unwrap();
        engine.save_brief(id, None).await.unwrap();
        id
    };

    let store = Arc::new(JsonFileStore::new(dir.path()).unwrap());
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);

    let engine = WorkflowEngine::new(store, ScriptedService::new());
    let workflow = engine.get_workflow(id).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Completed);
    assert_eq!(workflow.saved_briefs.len(), 1);
    assert!(workflow.output::<VideoBrief>().is_some());
    assert!(workflow.updated_at >= workflow.created_at);
}

#[tokio::test]
async fn test_store_failure_after_generation_does_not_leave_run_in_progress() {
    // Saves: create, running, then the stage result
    for failing_stage in [false, true] {
        let service = ScriptedService::new();
        if failing_stage {
            service.fail(StageName::TopicResearch);
        }
        let engine = WorkflowEngine::new(FlakyStore::failing_on(3), service.clone());
        let id = create(&engine, ControlLevel::Checkpoints).await;

        let err = engine
            .run_stage(id, StageName::TopicResearch, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
        assert_eq!(err.to_string(), "disk hiccup");

        let workflow = engine.get_workflow(id).await.unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Failed);
        assert_eq!(workflow.error.as_deref(), Some("disk hiccup"));
        assert_eq!(
            workflow.stage(StageName::TopicResearch).status,
            StageStatus::Pending
        );
        assert_eq!(workflow.stage(StageName::TopicResearch).attempts, 1);
    }
}

#[tokio::test]
async fn test_store_failure_before_generation_skips_the_run() {
    let service = ScriptedService::new();
    let engine = WorkflowEngine::new(FlakyStore::failing_on(2), service.clone());
    let id = create(&engine, ControlLevel::Checkpoints).await;

    assert!(engine
        .run_stage(id, StageName::TopicResearch, None)
        .await
        .is_err());
    assert_eq!(service.calls(), 0);

    let workflow = engine.get_workflow(id).await.unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Draft);
    assert_eq!(workflow.stage(StageName::TopicResearch).attempts, 0);
}
