//! End-to-end scenarios through the HTTP surface with mock clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use async_trait::async_trait;
use clients::{
    DraftBranchClient, DraftFile, LlmClient, MockDraftClient, MockLlmClient, MockResearchClient,
    ResearchClient,
};
use scribe::api::{create_router, AppState};
use scribe::vault::FsVaultService;
use scribe::{
    Database, Dispatcher, GraphCatalog, PipelineRunner, TaskQueue, Worker, WorkflowRegistry,
};

const MAX_PAGE_SIZE: i64 = 100;

/// Draft client counting its invocations, for asserting a node never ran.
#[derive(Clone, Default)]
struct CountingDraftClient {
    calls: Arc<AtomicUsize>,
    inner: MockDraftClient,
}

impl CountingDraftClient {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DraftBranchClient for CountingDraftClient {
    async fn create_draft_branch(&self, drafts: Vec<DraftFile>) -> clients::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_draft_branch(drafts).await
    }
}

async fn test_app(
    llm: Arc<dyn LlmClient>,
    research: Arc<dyn ResearchClient>,
    draft: Arc<dyn DraftBranchClient>,
) -> (Router, WorkflowRegistry) {
    let db = Arc::new(Database::test_in_memory().await.unwrap());
    let registry = WorkflowRegistry::new(db.clone());
    let catalog = Arc::new(GraphCatalog::with_article_proposal(llm, research, draft));
    let runner = Arc::new(PipelineRunner::new(
        registry.clone(),
        catalog.clone(),
        Arc::new(FsVaultService::new(None)),
        Duration::from_secs(600),
        Duration::from_secs(540),
    ));
    let (queue, rx) = TaskQueue::bounded(8);
    Worker::new(registry.clone(), runner.clone()).spawn(rx);
    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        catalog,
        queue,
        runner,
    ));

    let app = create_router(AppState {
        dispatcher,
        registry: registry.clone(),
        db,
        max_page_size: MAX_PAGE_SIZE,
    });
    (app, registry)
}

async fn default_app() -> (Router, WorkflowRegistry) {
    test_app(
        Arc::new(MockLlmClient::new()),
        Arc::new(MockResearchClient::new()),
        Arc::new(MockDraftClient::new()),
    )
    .await
}

async fn post_run(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/workflows/article-proposal/run")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Poll the read endpoint until the record goes terminal.
async fn await_terminal(app: &Router, id: i64) -> Value {
    for _ in 0..200 {
        let (status, body) = get_json(app, &format!("/workflows/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        let state = body["status"].as_str().unwrap();
        if state == "COMPLETED" || state == "FAILED" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow {} never reached a terminal state", id);
}

#[tokio::test]
async fn scenario_synchronous_happy_path() {
    let llm = MockLlmClient::with_response(
        r#"{"title": "Impact of Transformers on NLP", "summary": "A survey.",
            "tags": ["nlp", "ml"], "slug": "impact-of-transformers-on-nlp"}"#,
    );
    let research =
        MockResearchClient::with_article("# Impact of Transformers on NLP\n\nBody");
    let draft = MockDraftClient::with_branch("drafts/20250101-120000-impact-of-transformers-on-nlp");
    let (app, _) = test_app(Arc::new(llm), Arc::new(research), Arc::new(draft)).await;

    let (status, body) = post_run(
        &app,
        json!({"prompts": ["Impact of transformers on NLP"], "async_execution": false}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "COMPLETED");
    assert!(body["async_task_id"].is_null());
    let id = body["id"].as_i64().unwrap();

    let (status, record) = get_json(&app, &format!("/workflows/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(
        record["branch_name"],
        "drafts/20250101-120000-impact-of-transformers-on-nlp"
    );
    assert_eq!(record["progress_percent"], 100);
    assert!(record["error_message"].is_null());

    let node_results = record["metadata"]["node_results"].as_object().unwrap();
    assert_eq!(node_results.len(), 3);
    for node in ["topic_proposal", "deep_research", "submit_draft_branch"] {
        assert_eq!(node_results[node]["success"], json!(true), "{} failed", node);
    }
    assert_eq!(record["metadata"]["total_changes"], 1);
}

#[tokio::test]
async fn scenario_asynchronous_dispatch() {
    let (app, _) = default_app().await;

    let (status, body) = post_run(
        &app,
        json!({"prompts": ["Impact of transformers on NLP"], "async_execution": true}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "RUNNING");
    let task_id = body["async_task_id"].as_str().unwrap();
    assert!(!task_id.is_empty());
    let id = body["id"].as_i64().unwrap();

    let record = await_terminal(&app, id).await;
    assert_eq!(record["status"], "COMPLETED");
    assert_eq!(record["async_task_id"], task_id);
    assert_eq!(record["progress_percent"], 100);
    assert!(record["branch_name"].as_str().unwrap().starts_with("drafts/"));
    assert_eq!(
        record["metadata"]["node_results"].as_object().unwrap().len(),
        3
    );
}

#[tokio::test]
async fn scenario_validation_failure_creates_no_record() {
    let (app, _) = default_app().await;

    let (status, _) = post_run(&app, json!({"prompts": ["   "]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(&app, "/workflows?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert!(body["workflows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_deliberate_failure_hook() {
    let (app, _) = default_app().await;

    let (status, body) = post_run(
        &app,
        json!({"prompts": ["Please fail intentionally"], "async_execution": false}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "FAILED");
    let id = body["id"].as_i64().unwrap();

    let (_, record) = get_json(&app, &format!("/workflows/{}", id)).await;
    assert_eq!(record["status"], "FAILED");
    assert!(record["error_message"]
        .as_str()
        .unwrap()
        .contains("Intentional failure"));
    assert_eq!(record["progress_percent"], 100);
    assert!(record["branch_name"].is_null());

    let node_results = record["metadata"]["node_results"].as_object().unwrap();
    assert_eq!(node_results.len(), 1);
    assert_eq!(node_results["topic_proposal"]["success"], json!(false));
}

#[tokio::test]
async fn scenario_research_service_failure() {
    let draft = CountingDraftClient::default();
    let (app, _) = test_app(
        Arc::new(MockLlmClient::new()),
        Arc::new(MockResearchClient::failing("upstream down")),
        Arc::new(draft.clone()),
    )
    .await;

    let (status, body) = post_run(
        &app,
        json!({"prompts": ["Impact of transformers on NLP"], "async_execution": false}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "FAILED");
    let id = body["id"].as_i64().unwrap();

    let (_, record) = get_json(&app, &format!("/workflows/{}", id)).await;
    assert!(record["error_message"].as_str().unwrap().contains("upstream down"));

    let node_results = record["metadata"]["node_results"].as_object().unwrap();
    assert_eq!(node_results.len(), 2);
    assert_eq!(node_results["topic_proposal"]["success"], json!(true));
    assert_eq!(node_results["deep_research"]["success"], json!(false));

    // The draft gateway was never reached.
    assert_eq!(draft.calls(), 0);
}

#[tokio::test]
async fn scenario_unknown_workflow_type() {
    let (app, registry) = default_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/workflows/not-a-real-type/run")
                .header("content-type", "application/json")
                .body(Body::from(json!({"prompts": ["topic"]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, total) = registry.list(None, 10, 0).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn get_unknown_workflow_is_404() {
    let (app, _) = default_app().await;
    let (status, body) = get_json(&app, "/workflows/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("9999"));
}

#[tokio::test]
async fn list_pagination_boundaries() {
    let (app, _) = default_app().await;

    // Seed two completed workflows.
    for prompt in ["first topic", "second topic"] {
        let (status, _) = post_run(
            &app,
            json!({"prompts": [prompt], "async_execution": false}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // limit at the maximum is accepted.
    let (status, _) = get_json(&app, &format!("/workflows?limit={}", MAX_PAGE_SIZE)).await;
    assert_eq!(status, StatusCode::OK);

    // One past the maximum is rejected.
    let (status, _) = get_json(&app, &format!("/workflows?limit={}", MAX_PAGE_SIZE + 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Zero and negative offsets.
    let (status, _) = get_json(&app, "/workflows?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get_json(&app, "/workflows?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Offset zero returns the newest record first.
    let (status, body) = get_json(&app, "/workflows?limit=1&offset=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let newest = &body["workflows"][0];
    assert_eq!(newest["prompts"][0], "second topic");

    // Invalid status filter.
    let (status, _) = get_json(&app, "/workflows?status=DONE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid status filter.
    let (status, body) = get_json(&app, "/workflows?status=COMPLETED&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn status_sequence_is_observable_prefix() {
    let (app, registry) = default_app().await;

    let (_, body) = post_run(
        &app,
        json!({"prompts": ["watch the lifecycle"], "async_execution": true}),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    // Record observable statuses until terminal; duplicates collapse.
    let mut observed: Vec<String> = vec![body["status"].as_str().unwrap().to_string()];
    loop {
        let record = registry.get(id).await.unwrap();
        let status = record.status.to_string();
        if observed.last() != Some(&status) {
            observed.push(status.clone());
        }
        if record.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let allowed: &[&[&str]] = &[
        &["RUNNING", "COMPLETED"],
        &["RUNNING", "FAILED"],
        &["COMPLETED"],
        &["FAILED"],
    ];
    assert!(
        allowed.contains(&observed.iter().map(String::as_str).collect::<Vec<_>>().as_slice()),
        "unexpected status sequence: {:?}",
        observed
    );
}

#[tokio::test]
async fn terminal_timestamps_are_ordered() {
    let (app, registry) = default_app().await;

    let (_, body) = post_run(
        &app,
        json!({"prompts": ["order my timestamps"], "async_execution": false}),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let record = registry.get(id).await.unwrap();
    let started = record.started_at.unwrap();
    let completed = record.completed_at.unwrap();
    assert!(completed >= started);
    assert!(started >= record.created_at);
}
