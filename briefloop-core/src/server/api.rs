//! HTTP API for workflow clients

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::workflow::{ControlLevel, StageName, WorkflowInput, WorkflowState};
use crate::services::logging;
use crate::workflow::engine::{StageAction, WorkflowEngine};
use crate::workflow::quick::QuickBriefEngine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

type ApiReply = WithStatus<Json>;

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body for POST /api/workflows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub input: WorkflowInput,
    #[serde(default)]
    pub control_level: Option<String>,
}

/// Body for PATCH /api/workflows/:id/topic
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    #[serde(default)]
    pub topic_idea: Option<String>,
}

/// Body for POST /api/workflows/:id/run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, rename = "continue")]
    pub resume: bool,
}

/// Body for POST /api/workflows/:id/stages/:stage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageActionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub continue_to_next: Option<bool>,
}

impl StageActionRequest {
    fn into_action(self) -> WorkflowResult<StageAction> {
        match self.action.as_str() {
            "approve" => Ok(StageAction::Approve {
                continue_to_next: self.continue_to_next.unwrap_or(true),
            }),
            "reject" => Ok(StageAction::Reject {
                feedback: self.feedback.unwrap_or_default(),
            }),
            "rerun" => Ok(StageAction::Rerun {
                feedback: self.feedback,
            }),
            _ => Err(WorkflowError::validation(
                "Invalid action. Use: approve, reject, or rerun",
            )),
        }
    }
}

/// Body for POST /api/workflows/:id/briefs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveBriefRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body for POST /api/briefs
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuickBriefRequest {
    pub name: String,
    pub input: WorkflowInput,
}

/// Body for POST /api/briefs/:id/generate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateBriefRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BriefQuery {
    brief_id: Option<Uuid>,
}

#[derive(Serialize)]
struct WorkflowEnvelope {
    success: bool,
    workflow: WorkflowState,
}

impl From<WorkflowState> for WorkflowEnvelope {
    fn from(workflow: WorkflowState) -> Self {
        Self {
            success: true,
            workflow,
        }
    }
}

/// Create HTTP API routes
pub fn create_api_routes(
    engine: Arc<WorkflowEngine>,
    quick_briefs: Arc<QuickBriefEngine>,
    default_control_level: ControlLevel,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let engine_filter = warp::any().map(move || Arc::clone(&engine));
    let quick_filter = warp::any().map(move || Arc::clone(&quick_briefs));
    let level_filter = warp::any().map(move || default_control_level);
    let body = warp::body::bytes();

    // GET /api/workflows - List workflows, most recently updated first
    let list_workflows = warp::path!("api" / "workflows")
        .and(warp::get())
        .and(engine_filter.clone())
        .and_then(handle_list_workflows);

    // POST /api/workflows - Create a workflow
    let create_workflow = warp::path!("api" / "workflows")
        .and(warp::post())
        .and(body.clone())
        .and(engine_filter.clone())
        .and(level_filter)
        .and_then(handle_create_workflow);

    // GET /api/workflows/:id
    let get_workflow = warp::path!("api" / "workflows" / Uuid)
        .and(warp::get())
        .and(engine_filter.clone())
        .and_then(handle_get_workflow);

    // DELETE /api/workflows/:id
    let delete_workflow = warp::path!("api" / "workflows" / Uuid)
        .and(warp::delete())
        .and(engine_filter.clone())
        .and_then(handle_delete_workflow);

    // PATCH /api/workflows/:id/topic
    let update_topic = warp::path!("api" / "workflows" / Uuid / "topic")
        .and(warp::patch())
        .and(body.clone())
        .and(engine_filter.clone())
        .and_then(handle_update_topic);

    // POST /api/workflows/:id/reset
    let reset_workflow = warp::path!("api" / "workflows" / Uuid / "reset")
        .and(warp::post())
        .and(engine_filter.clone())
        .and_then(handle_reset_workflow);

    // POST /api/workflows/:id/run - Full pipeline, single stage or continue
    let run_workflow = warp::path!("api" / "workflows" / Uuid / "run")
        .and(warp::post())
        .and(body.clone())
        .and(engine_filter.clone())
        .and_then(handle_run_workflow);

    // POST /api/workflows/:id/stages/:stage - Approve, reject or rerun
    let stage_action = warp::path!("api" / "workflows" / Uuid / "stages" / String)
        .and(warp::post())
        .and(body.clone())
        .and(engine_filter.clone())
        .and_then(handle_stage_action);

    // POST /api/workflows/:id/briefs - Save the current brief
    let save_brief = warp::path!("api" / "workflows" / Uuid / "briefs")
        .and(warp::post())
        .and(body.clone())
        .and(engine_filter.clone())
        .and_then(handle_save_brief);

    // DELETE /api/workflows/:id/briefs?briefId=... - Delete a saved brief
    let delete_brief = warp::path!("api" / "workflows" / Uuid / "briefs")
        .and(warp::delete())
        .and(warp::query::<BriefQuery>())
        .and(engine_filter)
        .and_then(handle_delete_brief);

    // GET /api/briefs - List quick briefs
    let list_quick_briefs = warp::path!("api" / "briefs")
        .and(warp::get())
        .and(quick_filter.clone())
        .and_then(handle_list_quick_briefs);

    // POST /api/briefs - Create a quick brief
    let create_quick_brief = warp::path!("api" / "briefs")
        .and(warp::post())
        .and(body.clone())
        .and(quick_filter.clone())
        .and_then(handle_create_quick_brief);

    // GET /api/briefs/:id
    let get_quick_brief = warp::path!("api" / "briefs" / Uuid)
        .and(warp::get())
        .and(quick_filter.clone())
        .and_then(handle_get_quick_brief);

    // DELETE /api/briefs/:id
    let delete_quick_brief = warp::path!("api" / "briefs" / Uuid)
        .and(warp::delete())
        .and(quick_filter.clone())
        .and_then(handle_delete_quick_brief);

    // POST /api/briefs/:id/generate - Generate, or regenerate with feedback
    let generate_quick_brief = warp::path!("api" / "briefs" / Uuid / "generate")
        .and(warp::post())
        .and(body)
        .and(quick_filter)
        .and_then(handle_generate_quick_brief);

    // GET /api/v1/health - Health check endpoint
    let get_health = warp::path!("api" / "v1" / "health")
        .and(warp::get())
        .and_then(handle_get_health);

    list_workflows
        .or(create_workflow)
        .or(get_workflow)
        .or(delete_workflow)
        .or(update_topic)
        .or(reset_workflow)
        .or(run_workflow)
        .or(stage_action)
        .or(save_brief)
        .or(delete_brief)
        .or(list_quick_briefs)
        .or(create_quick_brief)
        .or(get_quick_brief)
        .or(delete_quick_brief)
        .or(generate_quick_brief)
        .or(get_health)
}

fn error_reply(err: &WorkflowError) -> ApiReply {
    let status = match err {
        WorkflowError::NotFound(_) | WorkflowError::BriefNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        logging::log_error(&format!("{:#}", err), Some("api"));
    }

    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": err.to_string() })),
        status,
    )
}

fn respond<T: Serialize>(result: WorkflowResult<T>, status: StatusCode) -> ApiReply {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), status),
        Err(err) => error_reply(&err),
    }
}

/// Parse a JSON body, treating an empty body as the default request
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> WorkflowResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_body(body)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> WorkflowResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| WorkflowError::validation(format!("Invalid JSON: {}", e)))
}

/// Handle GET /api/workflows
async fn handle_list_workflows(
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(engine.list_workflows().await, StatusCode::OK))
}

/// Handle POST /api/workflows
async fn handle_create_workflow(
    body: Bytes,
    engine: Arc<WorkflowEngine>,
    default_control_level: ControlLevel,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: CreateWorkflowRequest = parse_body(&body)?;
        let control_level = match request.control_level.as_deref() {
            Some(level) => level.parse::<ControlLevel>()?,
            None => default_control_level,
        };
        engine
            .create_workflow(&request.name, request.input, control_level)
            .await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

/// Handle GET /api/workflows/:id
async fn handle_get_workflow(
    id: Uuid,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(engine.get_workflow(id).await, StatusCode::OK))
}

/// Handle DELETE /api/workflows/:id
async fn handle_delete_workflow(
    id: Uuid,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = engine
        .delete_workflow(id)
        .await
        .map(|()| serde_json::json!({ "success": true }));
    Ok(respond(result, StatusCode::OK))
}

/// Handle PATCH /api/workflows/:id/topic
async fn handle_update_topic(
    id: Uuid,
    body: Bytes,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: TopicRequest = parse_optional_body(&body)?;
        engine.update_topic(id, request.topic_idea).await
    }
    .await
    .map(WorkflowEnvelope::from);

    Ok(respond(result, StatusCode::OK))
}

/// Handle POST /api/workflows/:id/reset
async fn handle_reset_workflow(
    id: Uuid,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = engine.reset_workflow(id).await.map(WorkflowEnvelope::from);
    Ok(respond(result, StatusCode::OK))
}

/// Handle POST /api/workflows/:id/run
async fn handle_run_workflow(
    id: Uuid,
    body: Bytes,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: RunRequest = parse_optional_body(&body)?;
        if request.resume {
            engine.continue_pipeline(id).await
        } else if let Some(stage) = request.stage {
            let stage: StageName = stage.parse()?;
            engine.run_stage(id, stage, None).await
        } else {
            engine.run_pipeline(id, None).await
        }
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

/// Handle POST /api/workflows/:id/stages/:stage
async fn handle_stage_action(
    id: Uuid,
    stage: String,
    body: Bytes,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let stage: StageName = stage.parse()?;
        let request: StageActionRequest = parse_body(&body)?;
        let action = request.into_action()?;
        engine.apply_stage_action(id, stage, action).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

/// Handle POST /api/workflows/:id/briefs
async fn handle_save_brief(
    id: Uuid,
    body: Bytes,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: SaveBriefRequest = parse_optional_body(&body)?;
        engine.save_brief(id, request.name).await
    }
    .await
    .map(|(saved_brief, workflow)| {
        serde_json::json!({
            "success": true,
            "savedBrief": saved_brief,
            "workflow": workflow,
        })
    });

    Ok(respond(result, StatusCode::OK))
}

/// Handle DELETE /api/workflows/:id/briefs
async fn handle_delete_brief(
    id: Uuid,
    query: BriefQuery,
    engine: Arc<WorkflowEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = match query.brief_id {
        Some(brief_id) => engine
            .delete_saved_brief(id, brief_id)
            .await
            .map(WorkflowEnvelope::from),
        None => Err(WorkflowError::validation("briefId is required")),
    };
    Ok(respond(result, StatusCode::OK))
}

/// Handle GET /api/briefs
async fn handle_list_quick_briefs(
    briefs: Arc<QuickBriefEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(briefs.list_briefs().await, StatusCode::OK))
}

/// Handle POST /api/briefs
async fn handle_create_quick_brief(
    body: Bytes,
    briefs: Arc<QuickBriefEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: CreateQuickBriefRequest = parse_body(&body)?;
        briefs.create_brief(&request.name, request.input).await
    }
    .await;

    Ok(respond(result, StatusCode::CREATED))
}

/// Handle GET /api/briefs/:id
async fn handle_get_quick_brief(
    id: Uuid,
    briefs: Arc<QuickBriefEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(respond(briefs.get_brief(id).await, StatusCode::OK))
}

/// Handle DELETE /api/briefs/:id
async fn handle_delete_quick_brief(
    id: Uuid,
    briefs: Arc<QuickBriefEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = briefs
        .delete_brief(id)
        .await
        .map(|()| serde_json::json!({ "success": true }));
    Ok(respond(result, StatusCode::OK))
}

/// Handle POST /api/briefs/:id/generate
async fn handle_generate_quick_brief(
    id: Uuid,
    body: Bytes,
    briefs: Arc<QuickBriefEngine>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = async {
        let request: GenerateBriefRequest = parse_optional_body(&body)?;
        briefs.generate_brief(id, request.feedback).await
    }
    .await;

    Ok(respond(result, StatusCode::OK))
}

/// Handle GET /api/v1/health
async fn handle_get_health() -> Result<impl warp::Reply, warp::Rejection> {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Ok(warp::reply::json(&response))
}
