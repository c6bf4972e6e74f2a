//! Step definitions — the immutable data a flow is built from.

use serde::{Deserialize, Serialize};

use crate::flow::ledger::AnswerLedger;
use crate::flow::validate::ValidationRule;

/// The interaction kind of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Opening message; any tap advances, nothing is recorded.
    Welcome,
    /// Pick exactly one of the step's options.
    ChoiceSingle,
    /// Toggle any number of options, then confirm with at least one.
    ChoiceMulti,
    /// Free-form text.
    FreeText,
    /// A money amount in whole rupees.
    NumericAmount,
    /// A date; free-form or strict depending on the validation rule.
    Date,
    /// Input matching a fixed shape (PAN).
    Pattern,
    /// Sentinel: reaching this step submits the ledger.
    Terminal,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::ChoiceSingle => "choice_single",
            Self::ChoiceMulti => "choice_multi",
            Self::FreeText => "free_text",
            Self::NumericAmount => "numeric_amount",
            Self::Date => "date",
            Self::Pattern => "pattern",
            Self::Terminal => "terminal",
        };
        write!(f, "{s}")
    }
}

/// How the step after this one is chosen.
#[derive(Debug, Clone)]
pub enum NextStep {
    /// The positional successor in the step list.
    Linear,
    /// Always this step.
    Goto(String),
    /// Decided from the answers recorded so far.
    Branch(fn(&AnswerLedger) -> String),
}

/// Where a step's selectable options come from at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionSource {
    /// The static list on the descriptor is all there is.
    Static,
    /// Fetched from the gateway's suggestion endpoint, keyed by prompt.
    Suggestions(String),
    /// Parsed from the recommendation follow-up for the seeded resource.
    FollowUp,
}

/// Immutable definition of one interaction point.
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub id: String,
    pub kind: StepKind,
    /// Display text template. `{step_id}` placeholders are replaced with
    /// prior answers when rendered.
    pub prompt: String,
    /// Selectable options for choice steps, suggestion chips for free-text
    /// steps. Doubles as the fallback list when a dynamic fetch fails.
    pub options: Vec<String>,
    pub rule: ValidationRule,
    pub next: NextStep,
    pub option_source: OptionSource,
}

impl StepDescriptor {
    /// New linear step with the default validation rule for its kind.
    pub fn new(id: impl Into<String>, kind: StepKind, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            prompt: prompt.into(),
            options: Vec::new(),
            rule: ValidationRule::default_for(kind),
            next: NextStep::Linear,
            option_source: OptionSource::Static,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_next(mut self, next: NextStep) -> Self {
        self.next = next;
        self
    }

    pub fn with_option_source(mut self, source: OptionSource) -> Self {
        self.option_source = source;
        self
    }

    /// Render the prompt template against the answers recorded so far.
    /// Placeholders without a matching answer are left as-is.
    pub fn render_prompt(&self, ledger: &AnswerLedger) -> String {
        if !self.prompt.contains('{') {
            return self.prompt.clone();
        }
        let mut prompt = self.prompt.clone();
        for (step_id, value) in ledger.snapshot() {
            let placeholder = format!("{{{step_id}}}");
            if prompt.contains(&placeholder) {
                prompt = prompt.replace(&placeholder, &value.to_string());
            }
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ledger::AnswerValue;

    #[test]
    fn default_rules_per_kind() {
        assert_eq!(
            StepDescriptor::new("w", StepKind::Welcome, "hi").rule,
            ValidationRule::None
        );
        assert_eq!(
            StepDescriptor::new("n", StepKind::FreeText, "name?").rule,
            ValidationRule::NonEmptyText
        );
        assert_eq!(
            StepDescriptor::new("a", StepKind::NumericAmount, "how much?").rule,
            ValidationRule::TargetAmount
        );
        assert_eq!(
            StepDescriptor::new("p", StepKind::Pattern, "pan?").rule,
            ValidationRule::TaxId
        );
        assert_eq!(
            StepDescriptor::new("c", StepKind::ChoiceSingle, "pick").rule,
            ValidationRule::OneOf
        );
        assert_eq!(
            StepDescriptor::new("m", StepKind::ChoiceMulti, "pick many").rule,
            ValidationRule::AnyOf
        );
    }

    #[test]
    fn render_prompt_fills_placeholders() {
        let mut ledger = AnswerLedger::new();
        ledger
            .record("name", AnswerValue::Text("Asha".into()))
            .unwrap();

        let step = StepDescriptor::new("dob", StepKind::Date, "When's your birthday, {name}?");
        assert_eq!(step.render_prompt(&ledger), "When's your birthday, Asha?");
    }

    #[test]
    fn render_prompt_leaves_unknown_placeholders() {
        let ledger = AnswerLedger::new();
        let step = StepDescriptor::new("x", StepKind::FreeText, "Hello {name}");
        assert_eq!(step.render_prompt(&ledger), "Hello {name}");
    }

    #[test]
    fn render_prompt_formats_amounts() {
        let mut ledger = AnswerLedger::new();
        ledger
            .record("target_amount", AnswerValue::Amount(100_000))
            .unwrap();

        let step = StepDescriptor::new("d", StepKind::Date, "When do you need {target_amount}?");
        assert_eq!(step.render_prompt(&ledger), "When do you need ₹1,00,000?");
    }
}
