use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::gemini::GeminiClient;

use super::{Agent, AgentError};

pub const MEMO_ERROR_CONTEXT: &str = "Error generating report";

/// Instruction for the report agent. `date` fills the memo's DATE field.
pub fn report_instruction(date: NaiveDate) -> String {
    format!(
        r#"
You are a Corporate Real Estate Secretary.
Your goal is to rewrite raw data into a formal 'Interoffice Memo' format.

You must strictly follow this template:

MEMORANDUM

TO:       Business Analyst

FROM:     Real Estate Analyst Team

DATE:     {date}

SUBJECT:  Investment Analysis - [Insert Location]


----------------------------------------------------------------------


EXECUTIVE SUMMARY
[Write a 2-3 sentence summary of the recommendation (Invest/Avoid) and main reason why.]


MARKET FUNDAMENTALS
[Summarize Demographics and Rent data here. Use bullet points.]


RISK ASSESSMENT
[Summarize Flood and Environmental risks here.]


CONCLUSION
[Final recommendation.]


----------------------------------------------------------------------
"#,
        date = date.format("%B %d, %Y")
    )
}

/// Formats gathered analysis into the interoffice memo via the hosted model.
#[derive(Debug, Clone)]
pub struct ReportAgent {
    client: GeminiClient,
    instruction: String,
}

impl ReportAgent {
    /// The memo date is fixed when the agent is built, not per call.
    pub fn new(client: GeminiClient) -> Self {
        Self::with_date(client, Local::now().date_naive())
    }

    pub fn with_date(client: GeminiClient, date: NaiveDate) -> Self {
        Self {
            client,
            instruction: report_instruction(date),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn prompt(&self, analysis_data: &str) -> String {
        format!("{}\n\nRAW DATA TO FORMAT:\n{}", self.instruction, analysis_data)
    }

    pub async fn generate_memo(&self, analysis_data: &str) -> Result<String, AgentError> {
        info!(
            "ReportAgent: formatting {} bytes of analysis with {}",
            analysis_data.len(),
            self.client.model()
        );
        let memo = self.client.generate_text(&self.prompt(analysis_data)).await?;
        info!("ReportAgent: received memo ({} bytes)", memo.len());
        Ok(memo)
    }
}

#[async_trait]
impl Agent for ReportAgent {
    type Input = String;
    type Output = String;

    async fn execute(&self, analysis_data: &Self::Input) -> Result<Self::Output, AgentError> {
        self.generate_memo(analysis_data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiSettings;

    fn agent() -> ReportAgent {
        let settings = GeminiSettings {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            base_url: "http://localhost".into(),
        };
        let client = GeminiClient::new(settings, 5).unwrap();
        ReportAgent::with_date(client, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())
    }

    #[test]
    fn instruction_carries_sections_and_date() {
        let agent = agent();
        let text = agent.instruction();
        assert!(text.contains("DATE:     March 07, 2025"));
        for section in ["MEMORANDUM", "EXECUTIVE SUMMARY", "MARKET FUNDAMENTALS", "RISK ASSESSMENT", "CONCLUSION"] {
            assert!(text.contains(section), "missing {section}");
        }
    }

    #[test]
    fn prompt_appends_raw_data() {
        let prompt = agent().prompt("Population: 23123");
        assert!(prompt.ends_with("\n\nRAW DATA TO FORMAT:\nPopulation: 23123"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let err = agent().execute(&"data".to_string()).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(crate::gemini::GeminiError::ConfigError { .. })));
    }
}
