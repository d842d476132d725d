use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] crate::gemini::GeminiError),
    #[error(transparent)]
    Lookup(#[from] crate::error::LookupError),
}

#[async_trait]
pub trait Agent {
    type Input: Send + Sync;
    type Output: Send + Sync;
    async fn execute(&self, input: &Self::Input) -> Result<Self::Output, AgentError>;
}

pub mod coordinator;
pub mod report;

pub use coordinator::Coordinator;
pub use report::ReportAgent;
