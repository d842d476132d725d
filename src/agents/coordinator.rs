use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use crate::census::CensusClient;
use crate::config::Config;
use crate::error::LookupError;
use crate::fema::FemaClient;
use crate::gemini::GeminiClient;
use crate::geo::PostalTable;
use crate::tools::{Capability, CapabilityRegistry, required_str, single_string_schema};
use crate::warehouse::BigQueryClient;

use super::{Agent, AgentError};
use super::report::{MEMO_ERROR_CONTEXT, ReportAgent};

pub const ROOT_AGENT_NAME: &str = "root_agent";
pub const ROOT_AGENT_DESCRIPTION: &str =
    "Coordinator agent that fetches data and delegates reporting";

pub const GET_DEMOGRAPHICS: &str = "get_demographics";
pub const CHECK_FLOOD_HISTORY: &str = "check_fema_flood_history";
pub const GENERATE_MEMO: &str = "generate_investment_memo";
pub const EXECUTE_SQL: &str = "execute_sql";
pub const LIST_TABLE_IDS: &str = "list_table_ids";
pub const GET_TABLE_INFO: &str = "get_table_info";

const CENSUS_ERROR_CONTEXT: &str = "Failed to fetch Census data";
const FEMA_ERROR_CONTEXT: &str = "Error connecting to FEMA API";
const WAREHOUSE_ERROR_CONTEXT: &str = "Error querying BigQuery";

/// Root agent binding: identity, instruction and the capabilities an agent
/// runtime may call. Planning and turn-taking belong to that runtime.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pub name: String,
    pub description: String,
    pub model: String,
    pub instruction: String,
    registry: CapabilityRegistry,
}

impl Coordinator {
    pub fn new(config: &Config, postal: Arc<PostalTable>) -> Result<Self, AgentError> {
        let census = CensusClient::new(config.census.clone(), config.timeout)?;
        let fema = FemaClient::new(config.fema.clone(), postal)?;
        let gemini = GeminiClient::new(config.gemini.clone(), config.timeout)?;
        let warehouse = BigQueryClient::new(config.warehouse.clone(), config.timeout)?;
        let report = ReportAgent::new(gemini);

        let registry = CapabilityRegistry::new()
            .with(demographics_capability(census))
            .with(flood_capability(fema))
            .with(memo_capability(report))
            .with(execute_sql_capability(warehouse.clone()))
            .with(list_tables_capability(warehouse.clone()))
            .with(table_info_capability(warehouse));

        info!(
            "Coordinator {} ready with {} capabilities",
            ROOT_AGENT_NAME,
            registry.len()
        );

        Ok(Self {
            name: ROOT_AGENT_NAME.to_string(),
            description: ROOT_AGENT_DESCRIPTION.to_string(),
            model: config.gemini.model.clone(),
            instruction: root_instruction(&config.warehouse.project_id, &config.warehouse.dataset_id),
            registry,
        })
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Agent definition for an external runtime: identity, instruction and tool declarations.
    pub fn manifest(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "model": self.model,
            "instruction": self.instruction,
            "tools": [{"functionDeclarations": self.registry.declarations()}],
        })
    }

    pub async fn invoke(&self, capability: &str, args: Value) -> String {
        self.registry.invoke(capability, args).await
    }
}

pub fn demographics_capability(census: CensusClient) -> Capability {
    Capability::new(
        GET_DEMOGRAPHICS,
        "Fetches population and median household income for a US zip code from the Census ACS 5-year estimates.",
        single_string_schema("zip_code", "Five digit US zip code"),
        move |args: Value| {
            let census = census.clone();
            async move {
                let zip = required_str(&args, "zip_code")?;
                let record = census.get_demographics(zip).await?;
                Ok(serde_json::to_string(&record)?)
            }
        },
    )
    .with_error_context(CENSUS_ERROR_CONTEXT)
}

pub fn flood_capability(fema: FemaClient) -> Capability {
    Capability::new(
        CHECK_FLOOD_HISTORY,
        "Lists the most recent FEMA flood disaster declarations for the county containing a US zip code.",
        single_string_schema("zip_code", "Five digit US zip code"),
        move |args: Value| {
            let fema = fema.clone();
            async move {
                let zip = required_str(&args, "zip_code")?;
                Ok(fema.check_flood_history(zip).await?.to_string())
            }
        },
    )
    .with_error_context(FEMA_ERROR_CONTEXT)
}

pub fn memo_capability(report: ReportAgent) -> Capability {
    Capability::new(
        GENERATE_MEMO,
        "Formats raw analysis into a professional interoffice investment memo. Use after all data has been gathered.",
        single_string_schema(
            "analysis_data",
            "The raw data, statistics, and findings to be formatted",
        ),
        move |args: Value| {
            let report = report.clone();
            async move {
                let data = required_str(&args, "analysis_data")?.to_string();
                report.execute(&data).await.map_err(agent_to_lookup)
            }
        },
    )
    .with_error_context(MEMO_ERROR_CONTEXT)
    .prefix_all_errors()
}

pub fn execute_sql_capability(warehouse: BigQueryClient) -> Capability {
    let description = format!(
        "Runs a read-only GoogleSQL query against BigQuery dataset {}.{}. Write statements are blocked.",
        warehouse.project_id(),
        warehouse.dataset_id()
    );
    Capability::new(
        EXECUTE_SQL,
        description,
        single_string_schema("query", "A single SELECT or WITH statement"),
        move |args: Value| {
            let warehouse = warehouse.clone();
            async move {
                let sql = required_str(&args, "query")?;
                let result = warehouse.execute_sql(sql).await?;
                Ok(serde_json::to_string(&result)?)
            }
        },
    )
    .with_error_context(WAREHOUSE_ERROR_CONTEXT)
}

pub fn list_tables_capability(warehouse: BigQueryClient) -> Capability {
    Capability::new(
        LIST_TABLE_IDS,
        "Lists the table ids in the real estate dataset.",
        json!({"type": "object", "properties": {}}),
        move |_args: Value| {
            let warehouse = warehouse.clone();
            async move { Ok(serde_json::to_string(&warehouse.list_table_ids().await?)?) }
        },
    )
    .with_error_context(WAREHOUSE_ERROR_CONTEXT)
}

pub fn table_info_capability(warehouse: BigQueryClient) -> Capability {
    Capability::new(
        GET_TABLE_INFO,
        "Returns schema and row count for one table in the real estate dataset.",
        single_string_schema("table_id", "Table id, e.g. safmr_2025"),
        move |args: Value| {
            let warehouse = warehouse.clone();
            async move {
                let table = required_str(&args, "table_id")?;
                Ok(warehouse.get_table_info(table).await?.to_string())
            }
        },
    )
    .with_error_context(WAREHOUSE_ERROR_CONTEXT)
}

fn agent_to_lookup(error: AgentError) -> LookupError {
    match error {
        AgentError::Llm(e) => e.into(),
        AgentError::Lookup(e) => e,
    }
}

pub fn root_instruction(project_id: &str, dataset_id: &str) -> String {
    format!(
        r#"You are the main customer service assistant for the Property Analyzer tool.
Your job is to interact with users, understand their requests for real estate data, and use the warehouse tools to provide accurate and insightful information.

**Your Data Context:**
All data is located in the Google Cloud project {project_id} within the BigQuery dataset {dataset_id}.

**Available Tables and Their Contents:**
*   **commercial_real_estate**: Commercial properties, including address and other attributes.
*   **nfib_losses_by_state**: Financial loss data by state, notably "Open Losses" and "Closed Without Payment Losses". High values indicate higher risk.
*   **nfib_policy_loss_stats_by_flood_zone_policy_stats**: Policy counts and details for specific flood zones, broken down by state.
*   **realtor_daat**: Residential for-sale listings, typically keyed by zip_code. Joins with the nfib tables on the state column.
*   **safmr_2025**: Small Area Fair Market Rents by zip code for properties of different sizes.

**How to help the user:**
1.  **Greeting:** At the start of a conversation, welcome the user to the Property Analyzer tool.
2.  **Clarify:** Identify the entities (states, zip codes, residential or commercial) and metrics (prices, policies, losses, rents) in the request. Ask a short follow-up question when the request is ambiguous.
3.  **Query the warehouse:** Use `{list}` and `{info}` to inspect tables when unsure of column names, then `{sql}` with a single read-only SELECT. Combine tables when the question needs it.
    *   **Example Call Formats** (column names are illustrative; confirm them with `{info}` first):
        *   To see what is available: `{list}()`, then `{info}(table_id="realtor_daat")`
        *   To find residential property details: `{sql}(query="SELECT AVG(price) AS avg_price, APPROX_QUANTILES(bed, 2)[OFFSET(1)] AS median_beds FROM realtor_daat WHERE state = 'California'")`
        *   To assess risk: `{sql}(query="SELECT state, open_losses FROM nfib_losses_by_state ORDER BY open_losses DESC LIMIT 10")`
        *   To combine data: `{sql}(query="SELECT AVG(r.price) AS avg_price FROM realtor_daat r JOIN nfib_policy_loss_stats_by_flood_zone_policy_stats p ON r.state = p.state WHERE p.flood_zone = 'A' AND p.policies > 1000")`
        *   To query commercial properties: `{sql}(query="SELECT * FROM commercial_real_estate WHERE address LIKE '%Elm St%' AND city = 'New York' LIMIT 20")`
        *   For specific zip codes: `{sql}(query="SELECT * FROM realtor_daat WHERE zip_code = '00680' LIMIT 20")`
        *   To query fair market rents by zip code: `{sql}(query="SELECT * FROM safmr_2025 WHERE zip_code = '12123'")`
    *   **Important:** Write each query as specifically as possible, selecting only the tables and columns relevant to the request.
4.  **Comprehensive zip code analysis:** When a user asks for a broad overview of a specific zip code, synthesize information from several tables. Query for-sale properties from realtor_daat, fair market rents from safmr_2025, and the state-level risk data from nfib_losses_by_state and nfib_policy_loss_stats_by_flood_zone_policy_stats, using one `{sql}` call per table or a join on the state column. Then call `{demo}` for population and income, and `{flood}` for flood disaster history.
    *   **Example**: for zip code 12123, run `{sql}(query="SELECT * FROM safmr_2025 WHERE zip_code = '12123'")`, query realtor_daat for the same zip_code, query both nfib tables for the listing's state, then call `{demo}(zip_code="12123")` and `{flood}(zip_code="12123")`.
5.  **Present results:** Summarize findings clearly and format numbers for readability. If a tool returns an error or no data, apologize and suggest a different question.
6.  **Maintain context:** Use previous turns to keep follow-up answers relevant.

**Rules:**
- Always query BigQuery first.
- If a specific zip code analysis is requested, use `{sql}` and `{demo}` for property, rent and population data, and `{flood}` for flood risk history when a zip code is available from the results.
- Use `{demo}` for Census data (population, income).
- Always delegate to `{memo}` for the final output.
"#,
        project_id = project_id,
        dataset_id = dataset_id,
        list = LIST_TABLE_IDS,
        info = GET_TABLE_INFO,
        sql = EXECUTE_SQL,
        demo = GET_DEMOGRAPHICS,
        flood = CHECK_FLOOD_HISTORY,
        memo = GENERATE_MEMO,
    )
}
