//! End-to-end engine scenarios against a scripted gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use finflow::catalog;
use finflow::error::{FlowError, GatewayError};
use finflow::flow::{
    AnswerValue, EngineEvent, FlowEngine, FlowSpec, FlowStatus, StepDescriptor, StepKind,
    StepStore,
};
use finflow::gateway::{BackendGateway, GatewayReply};
use finflow::session::{FlowSeed, SessionContext};

/// Scripted gateway: queued create replies, fixed option/follow-up maps,
/// and a record of every create call.
#[derive(Default)]
struct StubGateway {
    replies: Mutex<VecDeque<GatewayReply>>,
    options: Mutex<HashMap<String, Vec<String>>>,
    follow_ups: Mutex<HashMap<String, GatewayReply>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StubGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enqueue_reply(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(GatewayReply {
            status,
            body: body.to_string(),
        });
    }

    fn script_options(&self, prompt_key: &str, options: &[&str]) {
        self.options.lock().unwrap().insert(
            prompt_key.to_string(),
            options.iter().map(|s| s.to_string()).collect(),
        );
    }

    fn script_follow_up(&self, resource_id: &str, status: u16, body: &str) {
        self.follow_ups.lock().unwrap().insert(
            resource_id.to_string(),
            GatewayReply {
                status,
                body: body.to_string(),
            },
        );
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendGateway for StubGateway {
    async fn fetch_options(&self, prompt_key: &str) -> Result<Vec<String>, GatewayError> {
        self.options
            .lock()
            .unwrap()
            .get(prompt_key)
            .cloned()
            .ok_or_else(|| GatewayError::Transport("no suggestions scripted".to_string()))
    }

    async fn create_resource(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> Result<GatewayReply, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), payload.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Transport("no reply scripted".to_string()))
    }

    async fn fetch_follow_up(&self, resource_id: &str) -> Result<GatewayReply, GatewayError> {
        self.follow_ups
            .lock()
            .unwrap()
            .get(resource_id)
            .cloned()
            .ok_or_else(|| GatewayError::Transport("no follow-up scripted".to_string()))
    }
}

fn trip_payload(
    session: &SessionContext,
    _seed: &FlowSeed,
    _store: &StepStore,
    ledger: &finflow::flow::AnswerLedger,
) -> Value {
    json!({
        "phone_number": session.phone_number(),
        "name": ledger.get("name"),
        "target": ledger.get("target"),
    })
}

/// `[Welcome, FreeText("name"), NumericAmount("target"), Terminal]`
fn trip_flow() -> FlowSpec {
    FlowSpec {
        id: "trip".to_string(),
        store: StepStore::new(vec![
            StepDescriptor::new("welcome", StepKind::Welcome, "Ready to save?")
                .with_options(["Let's do this!"]),
            StepDescriptor::new("name", StepKind::FreeText, "What are you saving for?"),
            StepDescriptor::new("target", StepKind::NumericAmount, "How much do you need?"),
            StepDescriptor::new("done", StepKind::Terminal, "Creating your goal..."),
        ])
        .unwrap(),
        endpoint: "create_goal".to_string(),
        follow_up: None,
        build_payload: trip_payload,
    }
}

fn trip_engine(gateway: Arc<StubGateway>) -> FlowEngine {
    let spec = trip_flow();
    let mut flows = HashMap::new();
    flows.insert(spec.id.clone(), Arc::new(spec));
    FlowEngine::new(
        flows,
        "trip",
        SessionContext::new("7894561230").unwrap(),
        gateway,
    )
    .unwrap()
}

#[tokio::test]
async fn happy_path_submits_and_succeeds() {
    let gateway = StubGateway::new();
    gateway.enqueue_reply(200, r#"{"result":"Success"}"#);

    let mut engine = trip_engine(gateway.clone());
    engine.start().await.unwrap();

    engine.submit_answer("Let's do this!").await.unwrap();
    engine.submit_answer("Trip to Bali").await.unwrap();
    let event = engine.submit_answer("100000").await.unwrap();

    assert!(matches!(event, EngineEvent::Succeeded { .. }));
    assert_eq!(*engine.status(), FlowStatus::Succeeded);

    let snapshot = engine.ledger().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].0, "name");
    assert_eq!(snapshot[0].1, AnswerValue::Text("Trip to Bali".into()));
    assert_eq!(snapshot[1].0, "target");
    assert_eq!(snapshot[1].1, AnswerValue::Amount(100_000));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    let (endpoint, payload) = &calls[0];
    assert_eq!(endpoint, "create_goal");
    assert_eq!(payload["phone_number"], "7894561230");
    assert_eq!(payload["name"], "Trip to Bali");
    assert_eq!(payload["target"], 100_000);
}

#[tokio::test]
async fn negative_target_is_rejected_in_place() {
    let gateway = StubGateway::new();
    let mut engine = trip_engine(gateway.clone());
    engine.start().await.unwrap();

    engine.submit_answer("Let's do this!").await.unwrap();
    engine.submit_answer("Trip to Bali").await.unwrap();
    let event = engine.submit_answer("-5").await.unwrap();

    assert!(matches!(event, EngineEvent::Rejected { .. }));
    assert_eq!(engine.current_step().unwrap().id, "target");
    assert_eq!(*engine.status(), FlowStatus::InProgress);
    // Ledger untouched by the rejection
    assert_eq!(engine.ledger().len(), 1);
    assert!(engine.ledger().get("target").is_none());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn server_error_awaits_retry_then_resubmits_same_snapshot() {
    let gateway = StubGateway::new();
    gateway.enqueue_reply(500, r#"{"message":"server exploded"}"#);

    let mut engine = trip_engine(gateway.clone());
    engine.start().await.unwrap();
    engine.submit_answer("Let's do this!").await.unwrap();
    engine.submit_answer("Trip to Bali").await.unwrap();
    let event = engine.submit_answer("100000").await.unwrap();

    match event {
        EngineEvent::AwaitingRetry { message } => assert_eq!(message, "server exploded"),
        other => panic!("expected retry offer, got {other:?}"),
    }
    assert_eq!(*engine.status(), FlowStatus::AwaitingRetry);

    // No new answers are asked for; input is refused while waiting.
    assert!(matches!(
        engine.submit_answer("anything").await,
        Err(FlowError::NotAcceptingInput { .. })
    ));

    gateway.enqueue_reply(200, r#"{"result":"Success"}"#);
    let event = engine.retry().await.unwrap();
    assert!(matches!(event, EngineEvent::Succeeded { .. }));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, calls[1].1, "retry must reuse the same payload");
}

#[tokio::test]
async fn transport_failure_is_recoverable_too() {
    // Nothing scripted: the stub returns a transport error.
    let gateway = StubGateway::new();
    let mut engine = trip_engine(gateway.clone());
    engine.start().await.unwrap();
    engine.submit_answer("Let's do this!").await.unwrap();
    engine.submit_answer("Trip to Bali").await.unwrap();
    let event = engine.submit_answer("100000").await.unwrap();

    assert!(matches!(event, EngineEvent::AwaitingRetry { .. }));
    assert_eq!(*engine.status(), FlowStatus::AwaitingRetry);
}

#[tokio::test]
async fn linear_flow_advances_one_position_per_answer() {
    let spec = trip_flow();
    let store = &spec.store;
    let mut flows = HashMap::new();
    flows.insert(spec.id.clone(), Arc::new(trip_flow()));
    let mut engine = FlowEngine::new(
        flows,
        "trip",
        SessionContext::new("7894561230").unwrap(),
        StubGateway::new(),
    )
    .unwrap();

    engine.start().await.unwrap();
    assert_eq!(store.position(&engine.current_step().unwrap().id), Some(0));

    engine.submit_answer("Let's do this!").await.unwrap();
    assert_eq!(store.position(&engine.current_step().unwrap().id), Some(1));

    engine.submit_answer("Trip to Bali").await.unwrap();
    assert_eq!(store.position(&engine.current_step().unwrap().id), Some(2));
}

#[tokio::test]
async fn goal_creation_chains_into_fund_selection() {
    let gateway = StubGateway::new();
    gateway.script_options(
        "goal_suggesstion",
        &["Trip to Bali", "Emergency fund", "First Home"],
    );
    gateway.enqueue_reply(200, r#"{"goal_id":"g-7","recommendation_available":true}"#);
    gateway.script_follow_up("g-7", 200, r#"{"funds":["Quant Flexi Cap","PSU Index Fund"]}"#);
    gateway.enqueue_reply(200, r#"{"result":"Success"}"#);

    let mut engine = FlowEngine::new(
        catalog::all_flows().unwrap(),
        catalog::CREATE_GOAL,
        SessionContext::new("7894561230").unwrap(),
        gateway.clone(),
    )
    .unwrap();
    engine.start().await.unwrap();

    // Welcome tap, then the suggestion chips arrive from the gateway.
    let event = engine.submit_answer("").await.unwrap();
    match &event {
        EngineEvent::Prompt { step_id, options, .. } => {
            assert_eq!(step_id, "goal_name");
            assert_eq!(
                options,
                &["Trip to Bali", "Emergency fund", "First Home"]
            );
        }
        other => panic!("expected goal prompt, got {other:?}"),
    }

    engine.submit_answer("Trip to Bali").await.unwrap();
    engine.submit_answer("1,00,000").await.unwrap();
    engine.submit_answer("Dec 2025").await.unwrap();
    // Empty savings input means starting from zero.
    let event = engine.submit_answer("").await.unwrap();

    match &event {
        EngineEvent::Chained {
            flow_id, options, ..
        } => {
            assert_eq!(flow_id, catalog::FUND_SELECTION);
            assert_eq!(options, &["Quant Flexi Cap", "PSU Index Fund"]);
        }
        other => panic!("expected chain into fund selection, got {other:?}"),
    }
    assert_eq!(engine.flow_id(), catalog::FUND_SELECTION);
    assert_eq!(*engine.status(), FlowStatus::InProgress);

    // The goal run is archived and readable, and its answers are gone
    // from the active ledger.
    let runs = engine.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].flow_id, catalog::CREATE_GOAL);
    assert_eq!(
        runs[0].ledger.get("goal_name").unwrap().as_text(),
        Some("Trip to Bali")
    );
    assert!(engine.ledger().get("goal_name").is_none());

    // Pick a recommended fund and finish.
    let event = engine.submit_answer("Quant Flexi Cap").await.unwrap();
    assert!(matches!(event, EngineEvent::Succeeded { .. }));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "create_goal");
    assert_eq!(calls[0].1["target_amount"], 100_000);
    assert_eq!(calls[0].1["current_amount"], 0);
    assert_eq!(calls[1].0, "select_fund");
    assert_eq!(calls[1].1["goal_id"], "g-7");
    assert_eq!(calls[1].1["fund"], "Quant Flexi Cap");
}

#[tokio::test]
async fn suggestion_fetch_failure_falls_back_to_defaults() {
    let gateway = StubGateway::new(); // no options scripted
    let mut engine = FlowEngine::new(
        catalog::all_flows().unwrap(),
        catalog::CREATE_GOAL,
        SessionContext::new("7894561230").unwrap(),
        gateway,
    )
    .unwrap();
    engine.start().await.unwrap();

    let event = engine.submit_answer("").await.unwrap();
    match event {
        EngineEvent::Prompt { options, .. } => {
            assert!(options.contains(&"Retirement".to_string()));
            assert!(!options.is_empty());
        }
        other => panic!("expected goal prompt, got {other:?}"),
    }
}

#[tokio::test]
async fn basic_status_seed_starts_at_risk_questions() {
    let gateway = StubGateway::new();
    gateway.enqueue_reply(200, r#"{"result":"Success"}"#);

    let mut engine = FlowEngine::new(
        catalog::all_flows().unwrap(),
        catalog::ONBOARDING,
        SessionContext::new("7894561230").unwrap(),
        gateway.clone(),
    )
    .unwrap();
    let seed = catalog::seed_for_status("Basic").unwrap();
    let event = engine.start_seeded(seed).await.unwrap();

    assert!(matches!(event, EngineEvent::Prompt { ref step_id, .. } if step_id == "risk"));

    // Answer the risk sub-sequence straight through to submission.
    engine
        .submit_answer("Balanced - some ups and downs OK 🌊")
        .await
        .unwrap();
    engine
        .submit_answer("😐 Hold and wait")
        .await
        .unwrap();
    engine
        .submit_answer("Somewhat important — I want balance")
        .await
        .unwrap();
    engine.submit_answer("😐 A bit nervous").await.unwrap();
    let event = engine
        .submit_answer("Wealth creation 🚀")
        .await
        .unwrap();

    assert!(matches!(event, EngineEvent::Succeeded { .. }));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    let items = calls[0].1["risk_questions"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    // Identity fields were never asked, and never invented.
    assert!(calls[0].1["name"].is_null());
}

#[tokio::test]
async fn fatal_failure_requires_a_fresh_start() {
    let gateway = StubGateway::new();
    gateway.enqueue_reply(200, r#"{"result":"Error","message":"PAN already registered"}"#);

    let mut engine = trip_engine(gateway.clone());
    engine.start().await.unwrap();
    engine.submit_answer("Let's do this!").await.unwrap();
    engine.submit_answer("Trip to Bali").await.unwrap();
    let event = engine.submit_answer("100000").await.unwrap();

    assert!(matches!(event, EngineEvent::Failed { .. }));
    assert!(matches!(engine.status(), FlowStatus::Failed(_)));
    assert!(matches!(
        engine.retry().await,
        Err(FlowError::RetryUnavailable)
    ));

    // start() recovers with a clean ledger.
    gateway.enqueue_reply(200, r#"{"result":"Success"}"#);
    let event = engine.start().await.unwrap();
    assert!(matches!(event, EngineEvent::Prompt { ref step_id, .. } if step_id == "welcome"));
    assert!(engine.ledger().is_empty());
    assert_eq!(*engine.status(), FlowStatus::InProgress);
}
