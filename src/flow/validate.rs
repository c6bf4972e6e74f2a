//! Pure validators for raw user input.
//!
//! Every rule is a pure function from raw input to an outcome; failures
//! come back as data for the surface to render inline, never as errors.

use chrono::{NaiveDate, Utc};
use regex::Regex;

use crate::flow::ledger::AnswerValue;
use crate::flow::step::StepKind;

/// Result of validating one raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(AnswerValue),
    Rejected(String),
}

/// Which rule a step validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Welcome and terminal steps: anything advances, nothing is kept.
    None,
    /// Reject empty or whitespace-only input.
    NonEmptyText,
    /// A goal/income amount: formatting stripped, must be strictly positive.
    TargetAmount,
    /// An already-saved amount: empty means zero, must be non-negative.
    SavingsAmount,
    /// A free-form date: non-empty is all that's enforced here.
    FreeDate,
    /// Strict ISO birth date: real calendar date, strictly in the past.
    BirthDate,
    /// PAN shape: 5 letters, 4 digits, 1 letter, uppercased on the way in.
    TaxId,
    /// Must equal one of the step's current options.
    OneOf,
    /// Every selection must be one of the step's current options.
    AnyOf,
}

impl ValidationRule {
    /// The rule a step kind validates against unless overridden.
    pub fn default_for(kind: StepKind) -> Self {
        match kind {
            StepKind::Welcome | StepKind::Terminal => Self::None,
            StepKind::FreeText => Self::NonEmptyText,
            StepKind::NumericAmount => Self::TargetAmount,
            StepKind::Date => Self::FreeDate,
            StepKind::Pattern => Self::TaxId,
            StepKind::ChoiceSingle => Self::OneOf,
            StepKind::ChoiceMulti => Self::AnyOf,
        }
    }
}

/// Compiled validators. Construct once, validate many times.
pub struct ValidatorRegistry {
    birth_date: Regex,
    tax_id: Regex,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self {
            birth_date: Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(),
            tax_id: Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap(),
        }
    }

    /// Validate raw input against a rule, given the step's current options.
    pub fn validate(
        &self,
        rule: ValidationRule,
        raw: &str,
        options: &[String],
    ) -> ValidationOutcome {
        let trimmed = raw.trim();
        match rule {
            ValidationRule::None => ValidationOutcome::Accepted(AnswerValue::Text(
                trimmed.to_string(),
            )),
            ValidationRule::NonEmptyText => {
                if trimmed.is_empty() {
                    ValidationOutcome::Rejected("Please enter a value".to_string())
                } else {
                    ValidationOutcome::Accepted(AnswerValue::Text(trimmed.to_string()))
                }
            }
            ValidationRule::TargetAmount => match parse_amount(trimmed) {
                Some(n) if n > 0 => ValidationOutcome::Accepted(AnswerValue::Amount(n)),
                _ => ValidationOutcome::Rejected("Please enter a valid amount".to_string()),
            },
            ValidationRule::SavingsAmount => {
                if trimmed.is_empty() {
                    return ValidationOutcome::Accepted(AnswerValue::Amount(0));
                }
                match parse_amount(trimmed) {
                    Some(n) if n >= 0 => ValidationOutcome::Accepted(AnswerValue::Amount(n)),
                    _ => ValidationOutcome::Rejected(
                        "Please enter a valid amount (or leave empty for 0)".to_string(),
                    ),
                }
            }
            ValidationRule::FreeDate => {
                if trimmed.is_empty() {
                    ValidationOutcome::Rejected(
                        "Please enter a date (e.g., 12/12/2025 or Dec 2025)".to_string(),
                    )
                } else {
                    ValidationOutcome::Accepted(AnswerValue::Text(trimmed.to_string()))
                }
            }
            ValidationRule::BirthDate => self.validate_birth_date(trimmed),
            ValidationRule::TaxId => {
                let upper = trimmed.to_uppercase();
                if self.tax_id.is_match(&upper) {
                    ValidationOutcome::Accepted(AnswerValue::Text(upper))
                } else {
                    ValidationOutcome::Rejected(
                        "Please enter a valid PAN number (e.g., ABCDE1234F)".to_string(),
                    )
                }
            }
            ValidationRule::OneOf | ValidationRule::AnyOf => {
                if options.iter().any(|o| o == trimmed) {
                    ValidationOutcome::Accepted(AnswerValue::Text(trimmed.to_string()))
                } else {
                    ValidationOutcome::Rejected("Please pick one of the options".to_string())
                }
            }
        }
    }

    /// Validate a multi-select confirmation: at least one selection, all of
    /// them drawn from the step's current options.
    pub fn validate_selections(
        &self,
        selections: &[String],
        options: &[String],
    ) -> ValidationOutcome {
        if selections.is_empty() {
            return ValidationOutcome::Rejected("Pick at least one option".to_string());
        }
        if let Some(stray) = selections.iter().find(|s| !options.contains(*s)) {
            return ValidationOutcome::Rejected(format!(
                "{stray:?} is not one of the options"
            ));
        }
        ValidationOutcome::Accepted(AnswerValue::Selections(selections.to_vec()))
    }

    fn validate_birth_date(&self, trimmed: &str) -> ValidationOutcome {
        if trimmed.is_empty() || !self.birth_date.is_match(trimmed) {
            return ValidationOutcome::Rejected(
                "Please enter date in YYYY-MM-DD format (e.g., 1995-06-15)".to_string(),
            );
        }
        let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") else {
            return ValidationOutcome::Rejected("Please enter a valid birth date".to_string());
        };
        if date >= Utc::now().date_naive() {
            return ValidationOutcome::Rejected("Please enter a valid birth date".to_string());
        }
        ValidationOutcome::Accepted(AnswerValue::Text(trimmed.to_string()))
    }
}

/// Parse a money amount, stripping formatting characters.
///
/// The sign is read before stripping so `-5` stays negative instead of
/// collapsing into `5`; `10,000` and `₹10,000` both parse as `10000`.
fn parse_amount(trimmed: &str) -> Option<i64> {
    let negative = trimmed.starts_with('-');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}
