use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::Parser;

use clinical_safety::config;
use clinical_safety::models::ClinicalRecord;
use clinical_safety::safety::{DefaultSafetyEngine, FeatureSelection};

#[derive(Parser)]
#[command(name = "clinical-safety")]
#[command(version, about = "Evaluate a clinical record for medication safety risks")]
struct Cli {
    /// Clinical record as JSON
    record: PathBuf,
    /// Directory of reference tables (overrides the bundled set)
    #[arg(long)]
    reference_dir: Option<PathBuf>,
    /// Evaluation date for age derivation (YYYY-MM-DD, default today)
    #[arg(long)]
    as_of: Option<NaiveDate>,
    #[arg(long)]
    no_interactions: bool,
    #[arg(long)]
    no_contraindications: bool,
    #[arg(long)]
    no_dosage: bool,
    #[arg(long)]
    no_recommendations: bool,
    #[arg(long)]
    no_alerts: bool,
}

impl Cli {
    fn features(&self) -> FeatureSelection {
        FeatureSelection {
            interactions: !self.no_interactions,
            contraindications: !self.no_contraindications,
            dosage: !self.no_dosage,
            recommendations: !self.no_recommendations,
            alerts: !self.no_alerts,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    clinical_safety::init_logging();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let text = std::fs::read_to_string(&cli.record)?;
    let record: ClinicalRecord = serde_json::from_str(&text)?;

    let reference_dir = cli.reference_dir.clone().or_else(config::reference_data_dir);
    let engine = DefaultSafetyEngine::from_reference_dir(reference_dir.as_deref())?;

    let as_of = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let assessment = engine.evaluate_at(&record, &cli.features(), as_of);

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
