use anyhow::Error;
use colored::*;

use crate::agents::Coordinator;
use crate::gemini::GeminiError;
use crate::orchestrator::AnalysisOutcome;
use crate::types::PostalLocality;

pub fn display_welcome(coordinator: &Coordinator) {
    println!("{}", "🏠 Property Analyzer Console".bright_blue().bold());
    println!(
        "{}",
        format!(
            "Agent {} ({}) with {} capabilities.",
            coordinator.name,
            coordinator.model,
            coordinator.registry().len()
        )
        .blue()
    );
    println!(
        "{}",
        "Enter '<capability> <argument>' or '<capability> {json}'. '/tools' lists capabilities.".blue()
    );
    println!("{}", "Type '/quit' or '/exit' to stop.\n".blue());
}

pub fn display_tools(coordinator: &Coordinator) {
    println!("\n{}", "🧰 Capabilities".bright_cyan().bold());
    println!("{}", "┌─────────────────────────────────────────────────────────────".cyan());
    for name in coordinator.registry().names() {
        if let Some(cap) = coordinator.registry().get(name) {
            println!("{} {}", "│".cyan(), name.bright_white().bold());
            println!("{}   {}", "│".cyan(), cap.description().white());
        }
    }
    println!("{}", "└─────────────────────────────────────────────────────────────\n".cyan());
}

pub fn display_loading(capability: &str) {
    println!("{}", format!("🔄 Calling {}...", capability).blue().italic());
}

/// Capability output. Error strings are shown the same way the runtime sees them.
pub fn display_output(capability: &str, output: &str) {
    println!("\n{} {}", "📋 Result of".bright_green().bold(), capability.bright_green().bold());
    println!("{}", "┌─────────────────────────────────────────────────────────────".green());
    let pretty = serde_json::from_str::<serde_json::Value>(output)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| output.to_string());
    for line in pretty.lines() {
        println!("{} {}", "│".green(), line.white());
    }
    println!("{}", "└─────────────────────────────────────────────────────────────\n".green());
}

pub fn display_locality(locality: &PostalLocality) {
    if locality.is_missing() {
        println!(
            "{} {}",
            "❓ No location data for zip code".bright_yellow().bold(),
            locality.postal_code.bright_white()
        );
        return;
    }
    let dash = "-".to_string();
    println!("\n{}", "📍 Location".bright_yellow().bold());
    println!("{}", "┌─────────────────────────────────────────────────────────────".yellow());
    println!("{} {}", "│ Zip code:".yellow(), locality.postal_code.bright_white());
    println!("{} {}", "│ Place:".yellow(), locality.place_name.as_ref().unwrap_or(&dash).white());
    println!("{} {}", "│ State:".yellow(), locality.state_code.as_ref().unwrap_or(&dash).white());
    println!("{} {}", "│ County:".yellow(), locality.county_name.as_ref().unwrap_or(&dash).white());
    println!("{}", "└─────────────────────────────────────────────────────────────\n".yellow());
}

pub fn display_outcome(outcome: &AnalysisOutcome) {
    println!("\n{}", "🧾 Raw Analysis".bright_magenta().bold());
    println!("{}", "┌─────────────────────────────────────────────────────────────".magenta());
    for line in outcome.analysis.lines() {
        println!("{} {}", "│".magenta(), line.white());
    }
    println!("{}", "└─────────────────────────────────────────────────────────────\n".magenta());

    display_memo(&outcome.memo);
}

pub fn display_memo(memo: &str) {
    println!("{}", "📄 Investment Memo".bright_green().bold());
    println!("{}", "┌─────────────────────────────────────────────────────────────".green());
    for line in memo.lines() {
        println!("{} {}", "│".green(), line.white());
    }
    println!("{}", "└─────────────────────────────────────────────────────────────\n".green());
}

pub fn display_error(error: &Error) {
    println!("{} {}", "❌ Error:".bright_red().bold(), error.to_string().red());
    println!("{}", "Please check your configuration and try again.\n".red());
}

pub fn display_gemini_error(error: &GeminiError) {
    let user_message = error.user_message();
    match error {
        GeminiError::ServerBusy | GeminiError::Timeout { .. } => {
            println!("{}", user_message.bright_yellow().bold());
            println!("{}", "💡 Tip: Try again in a few minutes.".yellow());
        }
        GeminiError::ApiError { status, .. } => {
            println!("{}", user_message.bright_red().bold());
            match *status {
                401 | 403 => println!("{}", "💡 Tip: Check your GEMINI_API_KEY environment variable.".red()),
                429 => println!("{}", "💡 Tip: You've hit the rate limit. Wait before trying again.".red()),
                _ => {}
            }
        }
        GeminiError::ConfigError { .. } => {
            println!("{}", user_message.bright_red().bold());
            println!("{}", "💡 Tip: Check your environment variables and configuration.".red());
        }
        _ => println!("{}", user_message.bright_red().bold()),
    }
    println!();
}

pub fn display_goodbye() {
    println!("{}", "👋 Goodbye!".bright_yellow().bold());
}
