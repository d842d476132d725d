use anyhow::Result;
use colored::*;
use tokio::select;

use crate::agents::Coordinator;
use crate::gemini::GeminiError;
use crate::orchestrator::AnalysisOutcome;
use crate::types::PostalLocality;

mod input;
mod render;

pub use input::{Invocation, parse_invocation};

/// Interactive shell over the coordinator's capabilities.
pub struct Console {
    coordinator: Coordinator,
}

impl Console {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    pub fn display_output(capability: &str, output: &str) {
        render::display_output(capability, output);
    }

    pub fn display_locality(locality: &PostalLocality) {
        render::display_locality(locality);
    }

    pub fn display_outcome(outcome: &AnalysisOutcome) {
        render::display_outcome(outcome);
    }

    pub fn display_memo(memo: &str) {
        render::display_memo(memo);
    }

    pub fn display_error(error: &anyhow::Error) {
        render::display_error(error);
    }

    pub fn display_gemini_error(error: &GeminiError) {
        render::display_gemini_error(error);
    }

    /// First required parameter of a capability, used for plain-text arguments.
    fn first_param(&self, name: &str) -> Option<String> {
        self.coordinator
            .registry()
            .get(name)?
            .input_schema()
            .get("required")?
            .get(0)?
            .as_str()
            .map(str::to_string)
    }

    /// Run the console loop until `/quit`, EOF or Ctrl+C.
    pub async fn run(&self) -> Result<()> {
        render::display_welcome(&self.coordinator);
        let mut reader = input::LineReader::new();

        loop {
            select! {
                _ = tokio::signal::ctrl_c() => {
                    render::display_goodbye();
                    break;
                }
                line = reader.prompt_user("> ") => {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            println!("Error reading input: {}", e);
                            continue;
                        }
                    };

                    if line.is_empty() {
                        continue;
                    }
                    if input::is_quit_command(&line) {
                        render::display_goodbye();
                        break;
                    }
                    if line == "/tools" {
                        render::display_tools(&self.coordinator);
                        continue;
                    }

                    let Some(invocation) = parse_invocation(&line, |name| self.first_param(name)) else {
                        println!("{}", "⚠️ Could not parse arguments; expected text or a JSON object".bright_yellow());
                        continue;
                    };

                    render::display_loading(&invocation.capability);
                    select! {
                        _ = tokio::signal::ctrl_c() => {
                            println!("\n⚠️ Request cancelled by user");
                            render::display_goodbye();
                            break;
                        }
                        output = self.coordinator.invoke(&invocation.capability, invocation.args.clone()) => {
                            render::display_output(&invocation.capability, &output);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
