use crate::models::{AffordabilityRecord, Config, DataSourceMode, SelectedRecord};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const AFFORDABILITY_FILE: &str = "affordability_raw.csv";
pub const SELECTED_FILE: &str = "college_selected_raw.csv";

// Affordability table columns
const AFF_UNIT_ID: &str = "Unit ID";
const AFF_NAME: &str = "Institution Name";
const AFF_STATE: &str = "State Abbreviation";
const AFF_MSI_STATUS: &str = "MSI Status";
const AFF_WORK_STUDY: &str = "Average Work Study Award";
const AFF_GAP: &str =
    "Affordability Gap (net price minus income earned working 10 hrs at min wage)";

// MSI subtype designations and the affordability columns that flag them
const MSI_TYPE_COLUMNS: [(&str, &str); 7] = [
    ("HBCU", "Historically Black College or University (HBCU)"),
    (
        "AANAPISI",
        "Asian American or Native American Pacific Islander-Serving Institution (AANAPISI)",
    ),
    (
        "ANNHSI",
        "Alaska-Native, Native Hawaiian-Serving Institution (ANNHSI)",
    ),
    ("HSI", "Hispanic-serving Institution (HSI)"),
    ("NANTI", "Native American Non-Tribal Institution (NANTI)"),
    ("PBI", "Predominantly Black Institution (PBI)"),
    ("TCU", "Tribal College or University (TCU)"),
];

// College-selected table columns. The identifier column is named differently
// from the affordability table but carries the same values.
const SEL_UNIT_ID: &str = "UNIQUE_IDENTIFICATION_NUMBER_OF_THE_INSTITUTION";
const SEL_TUITION_IN: &str =
    "Average In-State Tuition for First-Time, Full-Time Undergraduates";
const SEL_TUITION_OUT: &str =
    "Out-of-State Average Tuition for First-Time, Full-Time Undergraduates";
const SEL_DEBT_DEP: &str = "Median Debt for Dependent Students";
const SEL_DEBT_IND: &str = "Median Debt for Independent Students";
const SEL_EARNINGS: &str =
    "Median Earnings of Students Working and Not Enrolled 10 Years After Entry";
const SEL_ENROLLMENT: &str = "Number of Undergraduates Enrolled";
const SEL_LOANS: &str =
    "Average Amount of Loans Awarded to First-Time, Full-Time Undergraduates";
const SEL_FED_GRANT: &str =
    "Average Amount of Federal Grant Aid Awarded to First-Time, Full-Time Undergraduates";
const SEL_INST_GRANT: &str =
    "Average Amount of Institutional Grant Aid Awarded to First-Time, Full-Time Undergraduates";

const DEMOGRAPHIC_COLUMNS: [(&str, &str); 8] = [
    (
        "American Indian / Alaska Native",
        "Percent of American Indian or Alaska Native Undergraduates",
    ),
    ("Two or More Races", "Percent of Two or More Races Undergraduates"),
    ("Asian", "Percent of Asian Undergraduates"),
    ("Black", "Percent of Black or African American Undergraduates"),
    ("Latino", "Percent of Latino Undergraduates"),
    (
        "Native Hawaiian / Pacific Islander",
        "Percent of Native Hawaiian or Other Pacific Islander Undergraduates",
    ),
    ("White", "Percent of White Undergraduates"),
    ("Unknown", "Percent of Undergraduates Race-Ethnicity Unknown"),
];

/// Header-name to column-index mapping, resolved once per file.
/// Identity columns are required; metric columns may be absent, in which
/// case every row loads with that metric missing.
struct ColumnMap {
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(headers: &csv::StringRecord) -> Self {
        let mut indices = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            indices.entry(header.trim().to_string()).or_insert(i);
        }
        Self { indices }
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.indices
            .get(name)
            .copied()
            .with_context(|| format!("Required column missing from dataset: {}", name))
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.find(name).and_then(|i| record.get(i))
    }
}

pub struct DatasetLoader {
    client: reqwest::Client,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Load both source tables according to the configured data source mode.
    pub async fn load(&self, config: &Config) -> Result<(Vec<AffordabilityRecord>, Vec<SelectedRecord>)> {
        let data_dir = config.data_directory.as_deref().unwrap_or("data-source");
        let affordability_path = Path::new(data_dir).join(AFFORDABILITY_FILE);
        let selected_path = Path::new(data_dir).join(SELECTED_FILE);

        match config.data_source_mode {
            DataSourceMode::Local => {
                let affordability = self.load_affordability_file(&affordability_path)?;
                let selected = self.load_selected_file(&selected_path)?;
                Ok((affordability, selected))
            }
            DataSourceMode::Internet => {
                let affordability_url = config
                    .affordability_url
                    .as_deref()
                    .context("data_source_mode is \"internet\" but affordability_url is not set")?;
                let selected_url = config
                    .selected_url
                    .as_deref()
                    .context("data_source_mode is \"internet\" but selected_url is not set")?;
                let affordability = self.fetch_affordability(affordability_url).await?;
                let selected = self.fetch_selected(selected_url).await?;
                Ok((affordability, selected))
            }
            DataSourceMode::Both => {
                // Prefer local files, fall back to the configured URLs per table
                let affordability = if affordability_path.exists() {
                    self.load_affordability_file(&affordability_path)?
                } else {
                    let url = config
                        .affordability_url
                        .as_deref()
                        .context("affordability file missing locally and affordability_url is not set")?;
                    self.fetch_affordability(url).await?
                };
                let selected = if selected_path.exists() {
                    self.load_selected_file(&selected_path)?
                } else {
                    let url = config
                        .selected_url
                        .as_deref()
                        .context("selected file missing locally and selected_url is not set")?;
                    self.fetch_selected(url).await?
                };
                Ok((affordability, selected))
            }
        }
    }

    pub fn load_affordability_file(&self, file_path: &Path) -> Result<Vec<AffordabilityRecord>> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;
        parse_affordability(&content)
    }

    pub fn load_selected_file(&self, file_path: &Path) -> Result<Vec<SelectedRecord>> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;
        parse_selected(&content)
    }

    pub async fn fetch_affordability(&self, url: &str) -> Result<Vec<AffordabilityRecord>> {
        let content = self.fetch_text(url).await?;
        parse_affordability(&content)
    }

    pub async fn fetch_selected(&self, url: &str) -> Result<Vec<SelectedRecord>> {
        let content = self.fetch_text(url).await?;
        parse_selected(&content)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        println!("🌐 Fetching data from: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP request failed with status: {}",
                response.status()
            ));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {}", url))
    }
}

pub fn parse_affordability(content: &str) -> Result<Vec<AffordabilityRecord>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::new(&headers);

    // Identity columns must exist; metric columns are allowed to be absent
    let unit_id_idx = columns.require(AFF_UNIT_ID)?;
    let name_idx = columns.require(AFF_NAME)?;
    let state_idx = columns.require(AFF_STATE)?;

    let cleaner = number_cleaner();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;

        // Rows without a usable identifier cannot join and are dropped here
        let unit_id = match parse_count(&cleaner, row.get(unit_id_idx).unwrap_or("")) {
            Some(id) => id,
            None => continue,
        };

        let mut msi_types = Vec::new();
        for (short_name, column) in MSI_TYPE_COLUMNS.iter() {
            if let Some(value) = columns.get(&row, column) {
                if parse_metric(&cleaner, value) == Some(1.0) {
                    msi_types.push(short_name.to_string());
                }
            }
        }

        records.push(AffordabilityRecord {
            unit_id,
            name: row.get(name_idx).unwrap_or("").trim().to_string(),
            state: row.get(state_idx).unwrap_or("").trim().to_string(),
            msi_status: columns
                .get(&row, AFF_MSI_STATUS)
                .and_then(|v| parse_metric(&cleaner, v))
                == Some(1.0),
            msi_types,
            work_study_average: columns
                .get(&row, AFF_WORK_STUDY)
                .and_then(|v| parse_metric(&cleaner, v)),
            affordability_gap: columns
                .get(&row, AFF_GAP)
                .and_then(|v| parse_metric(&cleaner, v)),
        });
    }

    Ok(records)
}

pub fn parse_selected(content: &str) -> Result<Vec<SelectedRecord>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::new(&headers);

    let unit_id_idx = columns.require(SEL_UNIT_ID)?;

    let cleaner = number_cleaner();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;

        let unit_id = match parse_count(&cleaner, row.get(unit_id_idx).unwrap_or("")) {
            Some(id) => id,
            None => continue,
        };

        let mut demographics = Vec::new();
        for (label, column) in DEMOGRAPHIC_COLUMNS.iter() {
            if let Some(value) = columns.get(&row, column) {
                if let Some(percent) = parse_metric(&cleaner, value) {
                    demographics.push((label.to_string(), percent));
                }
            }
        }

        let metric = |name: &str| columns.get(&row, name).and_then(|v| parse_metric(&cleaner, v));

        records.push(SelectedRecord {
            unit_id,
            tuition_in_state: metric(SEL_TUITION_IN),
            tuition_out_of_state: metric(SEL_TUITION_OUT),
            debt_dependent: metric(SEL_DEBT_DEP),
            debt_independent: metric(SEL_DEBT_IND),
            earnings_median: metric(SEL_EARNINGS),
            enrollment: columns
                .get(&row, SEL_ENROLLMENT)
                .and_then(|v| parse_count(&cleaner, v)),
            loan_average: metric(SEL_LOANS),
            federal_grant_average: metric(SEL_FED_GRANT),
            institutional_grant_average: metric(SEL_INST_GRANT),
            demographics,
        });
    }

    Ok(records)
}

fn number_cleaner() -> Regex {
    Regex::new(r"[^0-9.\-]").unwrap()
}

/// Parse a numeric cell from the messy source data. Cells carry currency
/// symbols, thousands separators, and suppression markers like
/// "PrivacySuppressed" or "N/A"; anything that cleans down to no digits is
/// treated as missing.
fn parse_metric(cleaner: &Regex, cell: &str) -> Option<f64> {
    let cleaned = cleaner.replace_all(cell.trim(), "");
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn parse_count(cleaner: &Regex, cell: &str) -> Option<u32> {
    parse_metric(cleaner, cell)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFFORDABILITY_CSV: &str = "\
Unit ID,Institution Name,State Abbreviation,MSI Status,Average Work Study Award,Affordability Gap (net price minus income earned working 10 hrs at min wage),Hispanic-serving Institution (HSI)
100654,Alpha University,AL,1,\"$2,400\",\"12,000\",1
100724,Beta College,GA,0,PrivacySuppressed,-500,0
,No Id College,TX,0,100,100,0
";

    const SELECTED_CSV: &str = "\
UNIQUE_IDENTIFICATION_NUMBER_OF_THE_INSTITUTION,\"Average In-State Tuition for First-Time, Full-Time Undergraduates\",\"Out-of-State Average Tuition for First-Time, Full-Time Undergraduates\",Median Debt for Dependent Students,Number of Undergraduates Enrolled,Percent of Asian Undergraduates
100654,9800,21000,15500,5200,4.5
100724,12000,N/A,,16000,2.1
";

    #[test]
    fn parses_affordability_rows_and_skips_missing_ids() {
        let records = parse_affordability(AFFORDABILITY_CSV).unwrap();
        assert_eq!(records.len(), 2);

        let alpha = &records[0];
        assert_eq!(alpha.unit_id, 100654);
        assert_eq!(alpha.name, "Alpha University");
        assert_eq!(alpha.state, "AL");
        assert!(alpha.msi_status);
        assert_eq!(alpha.msi_types, vec!["HSI".to_string()]);
        assert_eq!(alpha.work_study_average, Some(2400.0));
        assert_eq!(alpha.affordability_gap, Some(12000.0));
    }

    #[test]
    fn suppressed_and_empty_cells_load_as_missing() {
        let records = parse_affordability(AFFORDABILITY_CSV).unwrap();
        let beta = &records[1];
        assert!(!beta.msi_status);
        assert_eq!(beta.work_study_average, None);
        assert_eq!(beta.affordability_gap, Some(-500.0));
    }

    #[test]
    fn parses_selected_rows_with_partial_metrics() {
        let records = parse_selected(SELECTED_CSV).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].unit_id, 100654);
        assert_eq!(records[0].tuition_in_state, Some(9800.0));
        assert_eq!(records[0].enrollment, Some(5200));
        assert_eq!(records[0].demographics, vec![("Asian".to_string(), 4.5)]);

        assert_eq!(records[1].tuition_out_of_state, None);
        assert_eq!(records[1].debt_dependent, None);
        // Columns absent from the file load as missing for every row
        assert_eq!(records[1].debt_independent, None);
    }

    #[test]
    fn missing_identity_column_is_an_error_naming_it() {
        let result = parse_affordability("Institution Name,State Abbreviation\nA,AL\n");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Unit ID"));
    }

    #[test]
    fn metric_parsing_tolerates_messy_cells() {
        let cleaner = number_cleaner();
        assert_eq!(parse_metric(&cleaner, "$12,345"), Some(12345.0));
        assert_eq!(parse_metric(&cleaner, " 9800 "), Some(9800.0));
        assert_eq!(parse_metric(&cleaner, "-500"), Some(-500.0));
        assert_eq!(parse_metric(&cleaner, "PrivacySuppressed"), None);
        assert_eq!(parse_metric(&cleaner, "N/A"), None);
        assert_eq!(parse_metric(&cleaner, ""), None);
    }
}
