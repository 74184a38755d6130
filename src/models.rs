use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub home_state: String,
    pub residency_preference: ResidencyPreference,
    /// Tuition bounds in thousands of dollars, inclusive
    pub tuition_range: (u32, u32),
    /// Dependent-student debt bounds in thousands of dollars, inclusive
    pub debt_range: (u32, u32),
    pub require_msi: bool,
    pub size_preference: SizePreference,
    // Importance weights: 0 means the metric is ignored, 5 means crucial
    pub tuition_importance: u8,
    pub debt_importance: u8,
    pub earnings_importance: u8,
    pub aid_importance: u8,
    pub top_n: usize,
    pub selected_institution: Option<String>,
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub data_directory: Option<String>,
    pub affordability_url: Option<String>,
    pub selected_url: Option<String>,
    pub output_directory: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidencyPreference {
    #[serde(rename = "in-state")]
    InState,
    #[serde(rename = "out-of-state")]
    OutOfState,
    #[serde(rename = "no-preference")]
    NoPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizePreference {
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large")]
    Large,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
    #[serde(rename = "both")]
    Both,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_state: "".to_string(),
            residency_preference: ResidencyPreference::NoPreference,
            tuition_range: (20, 75),
            debt_range: (10, 40),
            require_msi: false,
            size_preference: SizePreference::Medium,
            tuition_importance: 3,
            debt_importance: 3,
            earnings_importance: 3,
            aid_importance: 3,
            top_n: 9,
            selected_institution: None,
            data_source_mode: DataSourceMode::Local,
            data_directory: Some("data-source".to_string()),
            affordability_url: Some("https://example.com/affordability_raw.csv".to_string()),
            selected_url: Some("https://example.com/college_selected_raw.csv".to_string()),
            output_directory: Some("output".to_string()),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// One row of the affordability table, keyed by Unit ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityRecord {
    pub unit_id: u32,
    pub name: String,
    pub state: String,
    /// Aggregate minority-serving flag
    pub msi_status: bool,
    /// MSI subtype designations that apply (HBCU, HSI, ...)
    pub msi_types: Vec<String>,
    pub work_study_average: Option<f64>,
    pub affordability_gap: Option<f64>,
}

/// One row of the college-selected table. Its identifier column is named
/// differently from the affordability table but carries the same values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedRecord {
    pub unit_id: u32,
    pub tuition_in_state: Option<f64>,
    pub tuition_out_of_state: Option<f64>,
    pub debt_dependent: Option<f64>,
    pub debt_independent: Option<f64>,
    pub earnings_median: Option<f64>,
    pub enrollment: Option<u32>,
    pub loan_average: Option<f64>,
    pub federal_grant_average: Option<f64>,
    pub institutional_grant_average: Option<f64>,
    /// Undergraduate race/ethnicity breakdown as (label, percent) pairs
    pub demographics: Vec<(String, f64)>,
}

impl SelectedRecord {
    pub fn size_class(&self) -> Option<SizePreference> {
        self.enrollment.map(classify_size)
    }
}

/// Classify a school by undergraduate enrollment.
/// Boundaries at 5000 and 15000, inclusive on the low side.
pub fn classify_size(enrollment: u32) -> SizePreference {
    if enrollment <= 5000 {
        SizePreference::Small
    } else if enrollment <= 15000 {
        SizePreference::Medium
    } else {
        SizePreference::Large
    }
}
