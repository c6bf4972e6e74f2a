//! Console surface — stdin/stdout chat loop for local runs.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::flow::engine::EngineEvent;
use crate::flow::ledger::AnswerValue;
use crate::flow::step::{StepDescriptor, StepKind};
use crate::surface::PresentationSurface;

/// Reads lines from stdin, writes the chat to stdout.
pub struct ConsoleSurface {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresentationSurface for ConsoleSurface {
    async fn render_prompt(
        &mut self,
        step: &StepDescriptor,
        rendered: &str,
        current: Option<&AnswerValue>,
    ) {
        println!("\n{rendered}");
        for option in &step.options {
            println!("  • {option}");
        }
        if step.kind == StepKind::ChoiceMulti {
            println!("  (toggle options by typing them, then 'done')");
        }
        if let Some(answer) = current {
            println!("  (current: {answer})");
        }
    }

    async fn read_input(&mut self) -> Option<String> {
        eprint!("> ");
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                None
            }
        }
    }

    async fn render_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Succeeded { .. } => {
                println!("\n🎉 All set! You're one step closer to making it happen. 💪✨");
            }
            EngineEvent::Chained { .. } => {
                println!("\n🎉 Your goal has been created successfully!");
            }
            EngineEvent::AwaitingRetry { message } => {
                println!("\nOops! {message}");
                println!("Would you like to try again or skip for now?");
            }
            EngineEvent::Failed { message } => {
                println!("\n❌ {message}");
            }
            EngineEvent::Prompt { .. } | EngineEvent::Rejected { .. } => {}
        }
    }

    async fn notify(&mut self, message: &str) {
        println!("ℹ️  {message}");
    }
}
