use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::agents::Coordinator;
use crate::agents::coordinator::{CHECK_FLOOD_HISTORY, EXECUTE_SQL, GENERATE_MEMO, GET_DEMOGRAPHICS};
use crate::geo::PostalTable;

/// Inputs for a single zip-code investment analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub zip_code: String,
    /// Read-only warehouse queries whose results are added to the analysis.
    pub queries: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub zip_code: String,
    pub analysis: String,
    pub memo: String,
    pub analysis_path: PathBuf,
    pub memo_path: PathBuf,
}

/// Fixed zip-code workflow: gather data through the coordinator's
/// capabilities, then hand the assembled text to the memo formatter.
pub struct Orchestrator {
    coordinator: Coordinator,
    postal: Arc<PostalTable>,
}

impl Orchestrator {
    pub fn new(coordinator: Coordinator, postal: Arc<PostalTable>) -> Self {
        Self {
            coordinator,
            postal,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Gather every section of raw analysis text for a zip code.
    pub async fn gather(&self, request: &AnalysisRequest) -> String {
        let zip = request.zip_code.as_str();
        let args = json!({"zip_code": zip});
        let mut sections = Vec::new();

        let locality = self.postal.resolve(zip);
        let location = match (&locality.place_name, &locality.state_code, &locality.county_name) {
            (Some(place), Some(state), Some(county)) => {
                format!("{}, {} ({} county)", place, state, county)
            }
            (Some(place), _, _) => place.clone(),
            _ => "unknown location".to_string(),
        };
        sections.push(format!("ZIP CODE: {}\nLOCATION: {}", zip, location));

        info!("Gathering demographics for {}", zip);
        let demographics = self.coordinator.invoke(GET_DEMOGRAPHICS, args.clone()).await;
        sections.push(format!("DEMOGRAPHICS (US Census ACS 5-year):\n{}", demographics));

        info!("Gathering flood history for {}", zip);
        let flood = self.coordinator.invoke(CHECK_FLOOD_HISTORY, args).await;
        sections.push(format!("FLOOD HISTORY (FEMA):\n{}", flood));

        for (idx, query) in request.queries.iter().enumerate() {
            info!("Running warehouse query {} of {}", idx + 1, request.queries.len());
            let result = self
                .coordinator
                .invoke(EXECUTE_SQL, json!({"query": query}))
                .await;
            sections.push(format!("WAREHOUSE QUERY {}:\n{}\nRESULT:\n{}", idx + 1, query, result));
        }

        if let Some(notes) = &request.notes
            && !notes.trim().is_empty()
        {
            sections.push(format!("ANALYST NOTES:\n{}", notes.trim()));
        }

        sections.join("\n\n")
    }

    /// Run the pipeline and persist `analysis.txt` and `memo.md` under `out_dir`.
    pub async fn run(&self, request: &AnalysisRequest, out_dir: &Path) -> Result<AnalysisOutcome> {
        info!("Pipeline mode: gather data → report agent");
        tokio::fs::create_dir_all(out_dir).await?;
        let analysis_path = out_dir.join("analysis.txt");
        let memo_path = out_dir.join("memo.md");

        let analysis = self.gather(request).await;
        tokio::fs::write(&analysis_path, &analysis).await?;
        info!("Saved raw analysis to {}", analysis_path.display());

        let memo = self
            .coordinator
            .invoke(GENERATE_MEMO, json!({"analysis_data": analysis}))
            .await;
        tokio::fs::write(&memo_path, &memo).await?;
        info!("Saved memo to {}", memo_path.display());

        Ok(AnalysisOutcome {
            zip_code: request.zip_code.clone(),
            analysis,
            memo,
            analysis_path,
            memo_path,
        })
    }
}
