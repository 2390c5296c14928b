use super::super::domain::{PredictionCategory, SelectionState, Tier};
use super::config::DiscardHighRule;

/// Flag a selection that contradicts the AI category.
///
/// Excluded properties are informational only and never flagged. An unset selection or a
/// missing category is the absence of a decision, not a wrong one.
pub fn classify_mismatch(
    selection: SelectionState,
    category: Option<PredictionCategory>,
    excluded: bool,
    rule: DiscardHighRule,
) -> bool {
    if excluded {
        return false;
    }

    let Some(category) = category else {
        return false;
    };

    match (selection, category.tier()) {
        (SelectionState::Prioritized, Tier::Low) => true,
        (SelectionState::Discarded, Tier::High) => match rule {
            DiscardHighRule::Always => true,
            DiscardHighRule::Never => false,
            DiscardHighRule::LegacyOnly => category.is_legacy(),
        },
        _ => false,
    }
}
