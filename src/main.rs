mod finder;
mod loader;
mod models;

use anyhow::Result;
use clap::{Arg, Command};
use finder::{CollegeDetail, CollegeFinder, Metric, Recommendation, ScoredCollege, WeightConfig};
use loader::DatasetLoader;
use models::Config;
use std::fs;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("college-finder")
        .version("1.0")
        .about("Finds and ranks colleges matching affordability preferences")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("detail")
                .short('d')
                .long("detail")
                .value_name("NAME_OR_ID")
                .help("Show the detail view for one institution (overrides selected_institution)"),
        )
        .get_matches();

    let config_file = matches.get_one::<String>("config").unwrap();

    // Load or create configuration
    let config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        println!(
            "⚠️  Please edit {} and set your home state, then run the program again.",
            config_file
        );
        return Ok(());
    };

    // Validate configuration
    if config.home_state.is_empty() {
        println!("❌ Error: home_state is empty in configuration file");
        println!(
            "   Please edit {} and set your state abbreviation",
            config_file
        );
        return Ok(());
    }

    let output_dir = config.output_directory.as_deref().unwrap_or("output");

    // Create output directory if it doesn't exist
    fs::create_dir_all(output_dir)?;

    // Clean up previous results
    clean_output_directory(output_dir)?;

    println!("🔍 Finding colleges for a {} resident", config.home_state);
    println!(
        "💵 Tuition range: ${}k to ${}k, debt range: ${}k to ${}k",
        config.tuition_range.0, config.tuition_range.1, config.debt_range.0, config.debt_range.1
    );
    println!("📄 Output directory: {} (cleaned)", output_dir);

    // Load both source tables
    let loader = DatasetLoader::new();
    let (affordability, selected) = loader.load(&config).await?;
    println!(
        "✅ Loaded {} affordability rows and {} college rows",
        affordability.len(),
        selected.len()
    );

    if affordability.is_empty() || selected.is_empty() {
        println!("❌ One of the source tables loaded no rows, nothing to rank");
        return Ok(());
    }

    let finder = CollegeFinder::new(&affordability, &selected);
    let weights = WeightConfig::from_config(&config);

    match finder.recommend(&config, &weights) {
        Recommendation::NoCandidates => {
            println!("⚠️  No colleges match your filters.");
        }
        Recommendation::NoJoinableRows => {
            println!("⚠️  After merging datasets, no colleges had the required fields.");
        }
        Recommendation::Ranked(ranked) => {
            print_summary(&ranked, config.top_n);
            generate_recommendations_csv(&ranked, output_dir)?;
            generate_top_n_report(&ranked, config.top_n, output_dir)?;
            println!("✅ Recommendation reports written to {}", output_dir);
        }
    }

    // Detail lookup: the CLI argument wins over the configured institution
    let detail_selector = matches
        .get_one::<String>("detail")
        .cloned()
        .or_else(|| config.selected_institution.clone());

    if let Some(selector) = detail_selector {
        if !selector.trim().is_empty() {
            match finder.find_detail(&selector) {
                Some(detail) => {
                    print_detail(&detail);
                    generate_detail_report(&detail, output_dir)?;
                }
                None => {
                    println!("❓ No detailed statistics found for: {}", selector);
                }
            }
        }
    }

    println!("\n✅ Analysis complete!");
    println!("📂 Results: {}", output_dir);
    Ok(())
}

fn print_summary(ranked: &[ScoredCollege], top_n: usize) {
    let shown = std::cmp::min(top_n, ranked.len());

    println!("\n📊 TOP {} RECOMMENDATIONS", shown);
    println!("========================\n");

    for (i, entry) in ranked.iter().take(top_n).enumerate() {
        println!(
            "   {}. {} ({}) - score {:.2}",
            i + 1,
            entry.college.name,
            entry.college.state,
            entry.score
        );
        println!(
            "      Median earnings (10y): {} | Dependent debt: {} | Enrollment: {}",
            format_dollars(entry.college.raw.get(&Metric::EarningsMedian).copied()),
            format_dollars(entry.college.raw.get(&Metric::DebtDependent).copied()),
            entry
                .college
                .enrollment
                .map(|e| group_thousands(e as i64))
                .unwrap_or_else(|| "N/A".to_string())
        );
    }

    println!("\n   {} of {} matching colleges shown", shown, ranked.len());
}

fn generate_recommendations_csv(ranked: &[ScoredCollege], output_dir: &str) -> Result<()> {
    use csv::Writer;

    let csv_path = Path::new(output_dir).join("recommendations.csv");
    let mut writer = Writer::from_path(csv_path)?;

    let mut headers = vec![
        "Rank".to_string(),
        "Unit ID".to_string(),
        "Institution Name".to_string(),
        "State".to_string(),
        "Score".to_string(),
        "MSI".to_string(),
    ];
    for metric in Metric::ALL {
        headers.push(metric.label().to_string());
    }
    writer.write_record(&headers)?;

    for (i, entry) in ranked.iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            entry.college.unit_id.to_string(),
            entry.college.name.clone(),
            entry.college.state.clone(),
            format!("{:.4}", entry.score),
            if entry.college.msi_status { "Yes" } else { "No" }.to_string(),
        ];
        for metric in Metric::ALL {
            row.push(
                entry
                    .college
                    .raw
                    .get(&metric)
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn generate_top_n_report(ranked: &[ScoredCollege], top_n: usize, output_dir: &str) -> Result<()> {
    let mut content = String::new();
    content.push_str("Top College Recommendations\n");
    content.push_str("===========================\n\n");

    for (i, entry) in ranked.iter().take(top_n).enumerate() {
        content.push_str(&format!(
            "{}. {} ({})\n\
            Score: {:.2}\n\
            Median Earnings (10y): {}\n\
            Median Debt (Dependent): {}\n\
            In-State Tuition: {}\n\
            Out-of-State Tuition: {}\n\
            Undergraduate Enrollment: {}\n\
            Minority Serving Institution: {}\n\n",
            i + 1,
            entry.college.name,
            entry.college.state,
            entry.score,
            format_dollars(entry.college.raw.get(&Metric::EarningsMedian).copied()),
            format_dollars(entry.college.raw.get(&Metric::DebtDependent).copied()),
            format_dollars(entry.college.raw.get(&Metric::TuitionInState).copied()),
            format_dollars(entry.college.raw.get(&Metric::TuitionOutOfState).copied()),
            entry
                .college
                .enrollment
                .map(|e| group_thousands(e as i64))
                .unwrap_or_else(|| "N/A".to_string()),
            if entry.college.msi_status { "Yes" } else { "No" },
        ));
    }

    fs::write(Path::new(output_dir).join("recommendations.txt"), content)?;
    Ok(())
}

fn print_detail(detail: &CollegeDetail) {
    let aff = &detail.affordability;
    let sel = &detail.selected;

    println!("\n🏫 {} ({})", aff.name, aff.state);
    println!("   Unit ID: {}", aff.unit_id);
    println!(
        "   Undergraduate enrollment: {}",
        sel.enrollment
            .map(|e| group_thousands(e as i64))
            .unwrap_or_else(|| "N/A".to_string())
    );
    if aff.msi_status {
        if aff.msi_types.is_empty() {
            println!("   Minority Serving Institution: Yes");
        } else {
            println!(
                "   Minority Serving Institution: Yes ({})",
                aff.msi_types.join(", ")
            );
        }
    } else {
        println!("   Minority Serving Institution: No");
    }
    println!(
        "   Tuition: {} in-state, {} out-of-state",
        format_dollars(sel.tuition_in_state),
        format_dollars(sel.tuition_out_of_state)
    );
    println!(
        "   Median debt: {} dependent, {} independent",
        format_dollars(sel.debt_dependent),
        format_dollars(sel.debt_independent)
    );
    println!(
        "   Median earnings (10y): {}",
        format_dollars(sel.earnings_median)
    );
    if let Some(ratio) = debt_to_earnings(sel.debt_dependent, sel.earnings_median) {
        println!("   Debt-to-earnings ratio: {:.2}", ratio);
    }
}

fn generate_detail_report(detail: &CollegeDetail, output_dir: &str) -> Result<()> {
    let aff = &detail.affordability;
    let sel = &detail.selected;

    let mut content = String::new();
    content.push_str(&format!("Detail View: {}\n", aff.name));
    content.push_str("==========================================\n\n");

    content.push_str(&format!("Unit ID: {}\n", aff.unit_id));
    content.push_str(&format!("State: {}\n", aff.state));
    content.push_str(&format!(
        "Undergraduate Enrollment: {}\n",
        sel.enrollment
            .map(|e| group_thousands(e as i64))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    if aff.msi_status {
        content.push_str("Minority Serving Institution: Yes\n");
        if !aff.msi_types.is_empty() {
            content.push_str(&format!("MSI Designations: {}\n", aff.msi_types.join(", ")));
        }
    } else {
        content.push_str("Minority Serving Institution: No\n");
    }

    content.push_str("\nTuition and Aid\n---------------\n");
    content.push_str(&format!(
        "In-State Tuition: {}\n",
        format_dollars(sel.tuition_in_state)
    ));
    content.push_str(&format!(
        "Out-of-State Tuition: {}\n",
        format_dollars(sel.tuition_out_of_state)
    ));
    content.push_str(&format!(
        "Average Loans Awarded: {}\n",
        format_dollars(sel.loan_average)
    ));
    content.push_str(&format!(
        "Average Federal Grant Aid: {}\n",
        format_dollars(sel.federal_grant_average)
    ));
    content.push_str(&format!(
        "Average Institutional Grant Aid: {}\n",
        format_dollars(sel.institutional_grant_average)
    ));
    content.push_str(&format!(
        "Average Work Study Award: {}\n",
        format_dollars(aff.work_study_average)
    ));
    content.push_str(&format!(
        "Affordability Gap: {}\n",
        format_dollars(aff.affordability_gap)
    ));

    content.push_str("\nDebt and Earnings\n-----------------\n");
    content.push_str(&format!(
        "Median Debt (Dependent): {}\n",
        format_dollars(sel.debt_dependent)
    ));
    content.push_str(&format!(
        "Median Debt (Independent): {}\n",
        format_dollars(sel.debt_independent)
    ));
    content.push_str(&format!(
        "Median Earnings (10y): {}\n",
        format_dollars(sel.earnings_median)
    ));
    if let Some(ratio) = debt_to_earnings(sel.debt_dependent, sel.earnings_median) {
        content.push_str(&format!("Debt-to-Earnings Ratio: {:.2}\n", ratio));
    }

    if !sel.demographics.is_empty() {
        content.push_str("\nUndergraduates by Race or Ethnicity\n");
        content.push_str("-----------------------------------\n");
        for (label, percent) in &sel.demographics {
            content.push_str(&format!("{}: {:.1}%\n", label, percent));
        }
    }

    fs::write(Path::new(output_dir).join("college_detail.txt"), content)?;
    Ok(())
}

/// Dependent debt over earnings, only meaningful with positive earnings
fn debt_to_earnings(debt: Option<f64>, earnings: Option<f64>) -> Option<f64> {
    match (debt, earnings) {
        (Some(debt), Some(earnings)) if earnings > 0.0 => Some(debt / earnings),
        _ => None,
    }
}

fn format_dollars(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let whole = v.round() as i64;
            if whole < 0 {
                format!("-${}", group_thousands(whole))
            } else {
                format!("${}", group_thousands(whole))
            }
        }
        None => "N/A".to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

// Clean up previous results from output directory
fn clean_output_directory(output_dir: &str) -> Result<()> {
    let output_path = Path::new(output_dir);

    if !output_path.exists() {
        return Ok(());
    }

    let items_to_clean = [
        "recommendations.csv",
        "recommendations.txt",
        "college_detail.txt",
    ];

    for item in &items_to_clean {
        let item_path = output_path.join(item);
        if item_path.is_file() {
            fs::remove_file(&item_path)?;
        }
    }

    Ok(())
}
