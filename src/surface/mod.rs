//! Presentation boundary — how prompts reach the user and raw answers
//! come back. The engine never renders; surfaces never validate.

pub mod console;

pub use console::ConsoleSurface;

use async_trait::async_trait;

use crate::error::FlowError;
use crate::flow::engine::{EngineEvent, FlowEngine, FlowStatus};
use crate::flow::ledger::AnswerValue;
use crate::flow::step::{StepDescriptor, StepKind};

/// Renders prompts and outcomes, and collects raw input.
#[async_trait]
pub trait PresentationSurface: Send {
    /// Show a step's prompt (already rendered) and its options.
    async fn render_prompt(
        &mut self,
        step: &StepDescriptor,
        rendered: &str,
        current: Option<&AnswerValue>,
    );

    /// Read the next raw input. `None` means the user abandoned the flow,
    /// which is always a safe way out.
    async fn read_input(&mut self) -> Option<String>;

    /// Show a terminal or noteworthy event (success, retry offer, chain).
    async fn render_event(&mut self, event: &EngineEvent);

    /// Inline notice on the current step (rejections, selection echoes).
    async fn notify(&mut self, message: &str);
}

/// Drive an engine with a surface until the flow finishes or the user
/// walks away. UX pacing belongs to the surface; the engine sees none
/// of it.
pub async fn run_flow(
    engine: &mut FlowEngine,
    surface: &mut dyn PresentationSurface,
) -> crate::error::Result<()> {
    loop {
        match engine.status().clone() {
            FlowStatus::InProgress => {
                let step = engine.current_step()?;
                let rendered = engine.prompt()?;
                let current = engine.ledger().get(&step.id).cloned();
                surface
                    .render_prompt(&step, &rendered, current.as_ref())
                    .await;

                let Some(input) = surface.read_input().await else {
                    return Ok(());
                };
                let input = input.trim().to_string();

                let event = if step.kind == StepKind::ChoiceMulti {
                    if input.eq_ignore_ascii_case("done") {
                        match engine.confirm_selection().await {
                            Ok(event) => event,
                            Err(FlowError::EmptySelection { .. }) => {
                                surface.notify("Pick at least one option first").await;
                                continue;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    } else {
                        match engine.toggle_option(&input) {
                            Ok(selection) => {
                                let echo = format!("Selected: {}", selection.join(", "));
                                surface.notify(&echo).await;
                                continue;
                            }
                            Err(FlowError::UnknownOption { .. }) => {
                                surface
                                    .notify("Pick one of the options, or type 'done'")
                                    .await;
                                continue;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                } else {
                    engine.submit_answer(&input).await?
                };

                match &event {
                    EngineEvent::Prompt { .. } => {}
                    EngineEvent::Rejected { message } => surface.notify(message).await,
                    other => surface.render_event(other).await,
                }
            }
            FlowStatus::AwaitingRetry => {
                surface
                    .notify("Type 'retry' to try again, or anything else to skip for now")
                    .await;
                let Some(input) = surface.read_input().await else {
                    return Ok(());
                };
                let input = input.trim();
                if input.eq_ignore_ascii_case("retry") || input.eq_ignore_ascii_case("try again")
                {
                    let event = engine.retry().await?;
                    surface.render_event(&event).await;
                } else {
                    // Abandon to the safe default.
                    return Ok(());
                }
            }
            FlowStatus::Succeeded | FlowStatus::Failed(_) => return Ok(()),
            FlowStatus::Submitting => {
                // Transitions are awaited inline, so a visible Submitting
                // means a dropped run. Nothing left to drive.
                return Ok(());
            }
        }
    }
}
