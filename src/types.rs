use std::fmt;

use serde::{Deserialize, Serialize};

/// A postal code resolved against the offline geography table.
///
/// An unknown code still produces a locality; `place_name` is `None` in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalLocality {
    pub postal_code: String,
    pub place_name: Option<String>,
    pub state_code: Option<String>,
    pub county_name: Option<String>,
}

impl PostalLocality {
    pub fn missing(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            place_name: None,
            state_code: None,
            county_name: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.place_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicsRecord {
    pub zip_code: String,
    pub population: String,
    pub median_household_income: String,
}

/// One OpenFEMA disaster declaration, as selected by the flood query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodDeclaration {
    pub disaster_number: i64,
    pub declaration_date: String,
    pub declaration_title: String,
}

impl FloodDeclaration {
    /// `YYYY-MM-DD`; longer timestamps are cut to their first 10 characters.
    pub fn short_date(&self) -> &str {
        match self.declaration_date.char_indices().nth(10) {
            Some((idx, _)) => &self.declaration_date[..idx],
            None => &self.declaration_date,
        }
    }
}

/// Outcome of a flood-history lookup for a resolved county.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloodReport {
    pub county: String,
    pub state_code: String,
    /// Newest first, at most ten.
    pub declarations: Vec<FloodDeclaration>,
}

impl fmt::Display for FloodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declarations.is_empty() {
            return write!(
                f,
                "Good news: No major FEMA Flood Declarations found for {}, {} in the database.",
                self.county, self.state_code
            );
        }
        write!(
            f,
            "Found {} major flood declarations for {} County:",
            self.declarations.len(),
            self.county
        )?;
        for d in &self.declarations {
            write!(
                f,
                "\n- {}: {} (Disaster #{})",
                d.short_date(),
                d.declaration_title,
                d.disaster_number
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(number: i64, date: &str, title: &str) -> FloodDeclaration {
        FloodDeclaration {
            disaster_number: number,
            declaration_date: date.to_string(),
            declaration_title: title.to_string(),
        }
    }

    #[test]
    fn empty_report_is_reassuring() {
        let report = FloodReport {
            county: "Miami-Dade".into(),
            state_code: "FL".into(),
            declarations: vec![],
        };
        assert_eq!(
            report.to_string(),
            "Good news: No major FEMA Flood Declarations found for Miami-Dade, FL in the database."
        );
    }

    #[test]
    fn report_lists_declarations_with_short_dates() {
        let report = FloodReport {
            county: "Lee".into(),
            state_code: "FL".into(),
            declarations: vec![
                declaration(4673, "2022-09-29T00:00:00.000Z", "Hurricane Ian"),
                declaration(1345, "2000-10-03", "Severe Storms and Flooding"),
            ],
        };
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Found 2 major flood declarations for Lee County:");
        assert_eq!(lines[1], "- 2022-09-29: Hurricane Ian (Disaster #4673)");
        assert_eq!(lines[2], "- 2000-10-03: Severe Storms and Flooding (Disaster #1345)");
    }

    #[test]
    fn short_date_keeps_short_values() {
        assert_eq!(declaration(1, "2021", "x").short_date(), "2021");
    }

    #[test]
    fn missing_locality_has_no_place_name() {
        let loc = PostalLocality::missing("00000");
        assert!(loc.is_missing());
        assert_eq!(loc.postal_code, "00000");
    }
}
