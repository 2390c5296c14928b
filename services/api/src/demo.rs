use crate::infra::{load_catalog, parse_selection, prediction_source, InMemorySubmissionRepository};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use underwriting_ai::config::AppConfig;
use underwriting_ai::error::AppError;
use underwriting_ai::workflows::underwriting::{
    adapt_records, GameServiceError, JsonFilePredictionSource, MockPredictionSource,
    PredictionSource, PropertyCatalog, Reconciliation, ReconciliationEngine, RowStatus,
    SelectionBoard, SelectionError, SelectionMode, SelectionState, TriageOutbox,
    UnderwritingGameService, UserSelection,
};

/// Round played by `demo`: A and E prioritized, B, D and F discarded, C left open.
const DEMO_ROUND: [SelectionState; 6] = [
    SelectionState::Prioritized,
    SelectionState::Discarded,
    SelectionState::Unset,
    SelectionState::Discarded,
    SelectionState::Prioritized,
    SelectionState::Discarded,
];

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Positional decisions for properties A, B, C, ... (P = prioritize, D = discard, U = unset)
    #[arg(long, value_delimiter = ',', value_parser = parse_selection, required = true)]
    pub(crate) selections: Vec<SelectionState>,
    /// Score against the legacy risk-label mock instead of propensity predictions
    #[arg(long)]
    pub(crate) legacy: bool,
    /// Prediction export (JSON array or `{ "results": [...] }`) to score against
    #[arg(long)]
    pub(crate) predictions: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Name recorded on the demo submission
    #[arg(long, default_value = "Demo Underwriter")]
    pub(crate) underwriter: String,
    /// Play the round against the legacy risk-label mock
    #[arg(long)]
    pub(crate) legacy: bool,
    /// Override the triage date used in notice subjects (defaults to today)
    #[arg(long)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        selections,
        legacy,
        predictions,
    } = args;

    let config = AppConfig::load()?;
    let catalog = load_catalog(&config.game);
    config.game.ensure_covers_catalog(catalog.len())?;
    let selections = positional_selections(&catalog, &selections)?;

    let source: Box<dyn PredictionSource> = match (predictions, legacy) {
        (Some(path), _) => Box::new(JsonFilePredictionSource::new(Some(path))),
        (None, true) => Box::new(MockPredictionSource::legacy()),
        (None, false) => Box::new(prediction_source(&config.game)),
    };

    let records = source
        .predict(&catalog.ids())
        .map_err(GameServiceError::from)?;
    let predictions = adapt_records(records)?;
    let reconciliation =
        ReconciliationEngine::new(config.game.reconciliation).reconcile(&selections, &predictions)?;

    println!("Underwriting round scored against {}", source.name());
    render_reconciliation(&catalog, &reconciliation);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        underwriter,
        legacy,
        today,
    } = args;

    let config = AppConfig::load()?;
    let catalog = load_catalog(&config.game);
    config.game.ensure_covers_catalog(catalog.len())?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Underwriting game demo");
    println!("\nProperties in this round");
    for property in catalog.properties() {
        println!(
            "- {} [{}] {}, {} | {} | age {} | value ${} | building ${} | contents ${} | {:?} construction risk",
            property.letter,
            property.submission_id,
            property.property_county,
            property.state,
            property.occupancy_type,
            property.property_age,
            property.property_value,
            property.building_coverage_limit,
            property.contents_coverage_limit,
            property.construction_risk,
        );
    }

    let source = if legacy {
        MockPredictionSource::legacy()
    } else {
        MockPredictionSource::standard()
    };
    let outbox = Arc::new(TriageOutbox::default());
    let service = UnderwritingGameService::new(
        catalog.clone(),
        Arc::new(InMemorySubmissionRepository::default()),
        Arc::new(source),
        outbox.clone(),
        config.game.reconciliation,
    )
    .with_triage_base_url(config.game.triage_base_url.clone());

    let mut board = SelectionBoard::new(SelectionMode::SingleChoice);
    for (property, selection) in catalog.ids().into_iter().zip(DEMO_ROUND) {
        match selection {
            SelectionState::Prioritized => board.toggle_prioritized(property),
            SelectionState::Discarded => board.toggle_discarded(property),
            SelectionState::Unset => {}
        }
    }
    let draft = board.draft(&underwriter).map_err(GameServiceError::from)?;

    let record = service.submit(draft)?;
    println!(
        "\nSubmission {} received from {}",
        record.id, record.draft.underwriter_name
    );
    let outcome = service.process(record.id)?;
    println!(
        "Processed {} predictions -> {}% alignment",
        outcome.count, outcome.score.percentage
    );

    let results = service.results(record.id)?;
    render_reconciliation(service.catalog(), &results.reconciliation);

    println!("\nStrongest local drivers per property");
    for property in &results.properties {
        let summary: Vec<String> = property
            .local_drivers
            .iter()
            .take(3)
            .map(|driver| format!("{} {:+.3}", driver.feature, driver.contribution))
            .collect();
        println!("- {}: {}", property.letter, summary.join(", "));
    }

    println!("\nLeaderboard");
    for entry in service.leaderboard()? {
        println!(
            "  {}. {} {}%",
            entry.rank, entry.underwriter_name, entry.score_percentage
        );
    }

    let summary = service.dispatch_triage(today)?;
    println!(
        "\nTriage dispatch: {:?} (High {}, Mid {}, Low {})",
        summary.status, summary.tiers.high, summary.tiers.mid, summary.tiers.low
    );
    if let Some(reason) = &summary.reason {
        println!("  {reason}");
    }
    match outbox.sent() {
        Ok(notices) => {
            for notice in notices {
                println!(
                    "  - {} -> {} [{}]",
                    notice.subject,
                    notice.link,
                    notice.submission_ids.join(", ")
                );
            }
        }
        Err(err) => println!("  Outbox unavailable: {err}"),
    }

    Ok(())
}

fn positional_selections(
    catalog: &PropertyCatalog,
    selections: &[SelectionState],
) -> Result<UserSelection, GameServiceError> {
    let ids = catalog.ids();
    if selections.len() > ids.len() {
        return Err(SelectionError::TooManySelections {
            supplied: selections.len(),
            available: ids.len(),
        }
        .into());
    }

    Ok(ids
        .into_iter()
        .zip(selections.iter().copied())
        .filter(|(_, selection)| *selection != SelectionState::Unset)
        .collect())
}

fn status_label(status: RowStatus) -> &'static str {
    match status {
        RowStatus::Match => "match",
        RowStatus::Mismatch => "MISMATCH",
        RowStatus::Excluded => "excluded",
        RowStatus::Undecided => "open",
    }
}

fn render_reconciliation(catalog: &PropertyCatalog, reconciliation: &Reconciliation) {
    println!("\nDecision comparison");
    for row in &reconciliation.rows {
        let county = catalog
            .get(row.property_id)
            .map(|property| property.property_county.as_str())
            .unwrap_or("unknown county");
        let ai = match (&row.ai_label, row.propensity_pct) {
            (Some(label), Some(pct)) => format!("{label} ({pct}%)"),
            (Some(label), None) => label.clone(),
            (None, _) => "no prediction".to_string(),
        };
        let points = row
            .points
            .map(|points| format!("{points:.1} pts"))
            .unwrap_or_else(|| "not scored".to_string());
        println!(
            "- {} {:<18} {:<11} AI {:<22} {:<9} {}",
            row.letter,
            county,
            row.selection.label(),
            ai,
            status_label(row.status),
            points
        );
        if let Some(reason) = &row.exclusion_reason {
            println!("    excluded upstream: {reason}");
        }
    }

    let score = &reconciliation.score;
    println!(
        "\nAlignment score: {}% ({:.1} of {:.1} points)",
        score.percentage, score.earned_points, score.max_points
    );
    if score.is_partial() {
        println!(
            "  Partial result: {} of {} properties had predictions",
            score.scored_count, score.expected_count
        );
    }
    println!("Mismatches flagged: {}", reconciliation.mismatch_count());

    let drivers = &reconciliation.drivers;
    println!(
        "\nTop AI drivers across {} properties",
        drivers.property_count
    );
    for driver in &drivers.drivers {
        let bar = "#".repeat((driver.bar_width_pct / 5.0).round() as usize);
        println!(
            "  {:<28} {:>6.3} {}",
            driver.feature, driver.mean_magnitude, bar
        );
    }
}
