//! Concrete flow definitions for the fin-advisor service.
//!
//! Prompts, options, endpoints, and payload field names follow the
//! deployed server contract; changing a key here breaks the backend.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::FlowError;
use crate::flow::ledger::AnswerLedger;
use crate::flow::step::{OptionSource, StepDescriptor, StepKind};
use crate::flow::store::StepStore;
use crate::flow::validate::ValidationRule;
use crate::flow::FlowSpec;
use crate::session::{FlowSeed, SessionContext};

/// Flow ids.
pub const ONBOARDING: &str = "onboarding";
pub const CREATE_GOAL: &str = "create_goal";
pub const FUND_SELECTION: &str = "fund_selection";

/// Fallback goal suggestions when the suggestion fetch fails.
const DEFAULT_GOALS: [&str; 5] = [
    "Retirement",
    "Emergency fund",
    "Dream vacation",
    "First Home",
    "Dream car",
];

/// Fallback funds when the recommendation fetch fails.
const DEFAULT_FUNDS: [&str; 3] = [
    "Balanced Advantage Fund",
    "Nifty 50 Index Fund",
    "Liquid Fund",
];

/// All flows the engine can run or chain into, keyed by id.
pub fn all_flows() -> Result<HashMap<String, Arc<FlowSpec>>, FlowError> {
    let mut flows = HashMap::new();
    for spec in [onboarding()?, create_goal()?, fund_selection()?] {
        flows.insert(spec.id.clone(), Arc::new(spec));
    }
    Ok(flows)
}

/// Map the server-reported onboarding status to how (or whether) the
/// onboarding flow should run.
///
/// `"Risk"` means fully onboarded (no flow to run); `"Basic"` means the
/// profile exists but the risk assessment is missing, so the run starts
/// at the risk sub-sequence; anything else is a full onboarding.
pub fn seed_for_status(status: &str) -> Option<FlowSeed> {
    match status {
        "Risk" => None,
        "Basic" => Some(FlowSeed::start_from("risk")),
        _ => Some(FlowSeed::default()),
    }
}

/// The full onboarding chat: identity, compliance, and risk profiling.
pub fn onboarding() -> Result<FlowSpec, FlowError> {
    let steps = vec![
        StepDescriptor::new(
            "welcome",
            StepKind::Welcome,
            "Hey there, money wizard 🪄 Ready to glow up your finances?",
        )
        .with_options(["Let's do this! 🚀", "Tell me more first 🤔"]),
        StepDescriptor::new(
            "name",
            StepKind::FreeText,
            "Awesome! What should I call you? ✨",
        ),
        StepDescriptor::new(
            "dob",
            StepKind::Date,
            "When's your birthday, {name}? 🎂 This helps me suggest the right investment timeline",
        )
        .with_rule(ValidationRule::BirthDate),
        StepDescriptor::new(
            "pan",
            StepKind::Pattern,
            "What's your PAN number? 🆔 This is required for investment compliance",
        ),
        StepDescriptor::new(
            "income",
            StepKind::NumericAmount,
            "What's your monthly income? (This stays private, obvs 🔒)",
        ),
        StepDescriptor::new(
            "marital_status",
            StepKind::ChoiceSingle,
            "What's your vibe right now? 💫 This helps me understand your financial priorities!",
        )
        .with_options([
            "💃🕺 Single",
            "👰🤵 Married, no kids yet",
            "👨‍👩‍👧‍👦 Married with kids",
            "🧑‍👧 Single parent",
            "👵👴 Taking care of parents/elders",
        ]),
        StepDescriptor::new(
            "goals",
            StepKind::ChoiceMulti,
            "What are you dreaming of? Pick everything that applies 🎯",
        )
        .with_options([
            "🏖️ Travel the world",
            "🏠 Own a home",
            "🚗 New wheels",
            "🛡️ Safety net",
            "🏝️ Retire early",
        ]),
        StepDescriptor::new(
            "risk",
            StepKind::ChoiceSingle,
            "On a scale from chill 🧊 to full-send 🚀 — how comfy are you with taking risks?",
        )
        .with_options([
            "Super chill - safety first 🧊",
            "Balanced - some ups and downs OK 🌊",
            "Let's go - I'm here for the ride 🚀",
        ]),
        StepDescriptor::new(
            "risk_1",
            StepKind::ChoiceSingle,
            "Let's say you invested ₹10,000 and it drops to ₹9,000. What would you do?",
        )
        .with_options([
            "😨 Sell everything and exit",
            "😐 Hold and wait",
            "📈 Invest more while it's low",
        ]),
        StepDescriptor::new(
            "risk_2",
            StepKind::ChoiceSingle,
            "How important is it for you to have guaranteed returns?",
        )
        .with_options([
            "Very important — I can't handle losses",
            "Somewhat important — I want balance",
            "Not important — I'm okay with risk for better gains",
        ]),
        StepDescriptor::new(
            "risk_3",
            StepKind::ChoiceSingle,
            "How would you feel if your investment value dropped 20% temporarily?",
        )
        .with_options([
            "😬 Very stressed",
            "😐 A bit nervous",
            "😎 Chill, markets go up and down",
        ]),
        StepDescriptor::new(
            "risk_4",
            StepKind::ChoiceSingle,
            "What's your primary investment goal?",
        )
        .with_options([
            "Capital preservation 💼",
            "Wealth creation 🚀",
            "Maximize returns 💰",
        ]),
        StepDescriptor::new(
            "complete",
            StepKind::Terminal,
            "Amazing! 🎉 I'm creating your personalized financial plan. Ready to see what your money can do?",
        ),
    ];
    Ok(FlowSpec {
        id: ONBOARDING.to_string(),
        store: StepStore::new(steps)?,
        endpoint: "user_onboard".to_string(),
        follow_up: None,
        build_payload: onboarding_payload,
    })
}

/// The goal-creation chat, chaining into fund selection when the server
/// has a recommendation ready.
pub fn create_goal() -> Result<FlowSpec, FlowError> {
    let steps = vec![
        StepDescriptor::new(
            "welcome",
            StepKind::Welcome,
            "Hey there! 🎯 I'm here to help you create your next financial goal. Let's make your dreams happen! ✨",
        ),
        StepDescriptor::new(
            "goal_name",
            StepKind::FreeText,
            "What goal would you like to work towards? You can pick from these popular ones or tell me your own! 💭",
        )
        .with_options(DEFAULT_GOALS)
        .with_option_source(OptionSource::Suggestions("goal_suggesstion".to_string())),
        StepDescriptor::new(
            "target_amount",
            StepKind::NumericAmount,
            "Awesome choice! 🚀 How much money do you need to reach {goal_name}?",
        ),
        StepDescriptor::new(
            "target_date",
            StepKind::Date,
            "Perfect! 📅 When would you like to achieve this goal?",
        ),
        StepDescriptor::new(
            "amount_saved",
            StepKind::NumericAmount,
            "Great! 💰 Do you already have some money saved for this goal?",
        )
        .with_rule(ValidationRule::SavingsAmount),
        StepDescriptor::new(
            "creating",
            StepKind::Terminal,
            "Amazing! 🎉 I'm creating your goal now. This is going to be epic!",
        ),
    ];
    Ok(FlowSpec {
        id: CREATE_GOAL.to_string(),
        store: StepStore::new(steps)?,
        endpoint: "create_goal".to_string(),
        follow_up: Some(FUND_SELECTION.to_string()),
        build_payload: create_goal_payload,
    })
}

/// The follow-up fund pick after a goal is created.
pub fn fund_selection() -> Result<FlowSpec, FlowError> {
    let steps = vec![
        StepDescriptor::new(
            "fund",
            StepKind::ChoiceSingle,
            "Your goal is live! 🎉 Based on your profile, here are some funds that fit. Pick one to get started 📈",
        )
        .with_options(DEFAULT_FUNDS)
        .with_option_source(OptionSource::FollowUp),
        StepDescriptor::new("confirm", StepKind::Terminal, "Locking in your pick... 🤝"),
    ];
    Ok(FlowSpec {
        id: FUND_SELECTION.to_string(),
        store: StepStore::new(steps)?,
        endpoint: "select_fund".to_string(),
        follow_up: None,
        build_payload: fund_selection_payload,
    })
}

fn onboarding_payload(
    session: &SessionContext,
    _seed: &FlowSeed,
    store: &StepStore,
    ledger: &AnswerLedger,
) -> Value {
    // Risk answers go out as question/answer pairs, with the step's
    // prompt text as the question.
    let items: Vec<Value> = ledger
        .snapshot()
        .iter()
        .filter(|(step_id, _)| step_id.starts_with("risk"))
        .map(|(step_id, answer)| {
            let question = store
                .step(step_id)
                .map(|s| s.prompt)
                .unwrap_or_else(|| step_id.clone());
            json!({ "question": question, "answer": answer })
        })
        .collect();
    json!({
        "phone_number": session.phone_number(),
        "name": ledger.get("name"),
        "dob": ledger.get("dob"),
        "marital_status": ledger.get("marital_status"),
        "income": ledger.get("income"),
        "pan": ledger.get("pan"),
        "goals": ledger.get("goals"),
        "risk_questions": { "items": items },
    })
}

fn create_goal_payload(
    session: &SessionContext,
    _seed: &FlowSeed,
    _store: &StepStore,
    ledger: &AnswerLedger,
) -> Value {
    json!({
        "phone_number": session.phone_number(),
        "goal_name": ledger.get("goal_name"),
        "target_amount": ledger.get("target_amount"),
        "target_date": ledger.get("target_date"),
        "current_amount": ledger.get("amount_saved"),
    })
}

fn fund_selection_payload(
    session: &SessionContext,
    seed: &FlowSeed,
    _store: &StepStore,
    ledger: &AnswerLedger,
) -> Value {
    json!({
        "phone_number": session.phone_number(),
        "goal_id": seed.resource_id,
        "fund": ledger.get("fund"),
    })
}
