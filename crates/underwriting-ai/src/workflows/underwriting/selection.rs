use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{PropertyId, SelectionState};
use super::reconciliation::UserSelection;

/// How the two toggles on a property card interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Choosing one action clears the other.
    #[default]
    SingleChoice,
    /// Both toggles flip independently; a property holding both is a conflict.
    IndependentToggle,
}

/// What the board shows for one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardState {
    Prioritized,
    Discarded,
    Unset,
    Conflict,
}

/// Live selection state for one underwriter session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionBoard {
    mode: SelectionMode,
    prioritized: BTreeSet<PropertyId>,
    discarded: BTreeSet<PropertyId>,
}

impl SelectionBoard {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn toggle_prioritized(&mut self, property: PropertyId) {
        if !self.prioritized.remove(&property) {
            self.prioritized.insert(property);
            if self.mode == SelectionMode::SingleChoice {
                self.discarded.remove(&property);
            }
        }
    }

    pub fn toggle_discarded(&mut self, property: PropertyId) {
        if !self.discarded.remove(&property) {
            self.discarded.insert(property);
            if self.mode == SelectionMode::SingleChoice {
                self.prioritized.remove(&property);
            }
        }
    }

    pub fn clear(&mut self, property: PropertyId) {
        self.prioritized.remove(&property);
        self.discarded.remove(&property);
    }

    pub fn state(&self, property: PropertyId) -> BoardState {
        match (
            self.prioritized.contains(&property),
            self.discarded.contains(&property),
        ) {
            (true, true) => BoardState::Conflict,
            (true, false) => BoardState::Prioritized,
            (false, true) => BoardState::Discarded,
            (false, false) => BoardState::Unset,
        }
    }

    pub fn conflicts(&self) -> Vec<PropertyId> {
        self.prioritized
            .intersection(&self.discarded)
            .copied()
            .collect()
    }

    pub fn prioritized(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.prioritized.iter().copied()
    }

    pub fn discarded(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.discarded.iter().copied()
    }

    /// Freeze the board into a submission, enforcing the submit-button rules.
    pub fn draft(&self, underwriter_name: &str) -> Result<SubmissionDraft, SelectionError> {
        SubmissionDraft::new(
            underwriter_name,
            self.prioritized.iter().copied().collect(),
            self.discarded.iter().copied().collect(),
        )
    }
}

/// Validated submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub underwriter_name: String,
    pub prioritized_ids: Vec<PropertyId>,
    pub discarded_ids: Vec<PropertyId>,
}

impl SubmissionDraft {
    pub fn new(
        underwriter_name: &str,
        prioritized_ids: Vec<PropertyId>,
        discarded_ids: Vec<PropertyId>,
    ) -> Result<Self, SelectionError> {
        let underwriter_name = underwriter_name.trim();
        if underwriter_name.is_empty() {
            return Err(SelectionError::MissingUnderwriterName);
        }

        let prioritized: BTreeSet<PropertyId> = prioritized_ids.into_iter().collect();
        let discarded: BTreeSet<PropertyId> = discarded_ids.into_iter().collect();

        let overlap: Vec<PropertyId> = prioritized.intersection(&discarded).copied().collect();
        if !overlap.is_empty() {
            return Err(SelectionError::Conflict(overlap));
        }
        if prioritized.is_empty() {
            return Err(SelectionError::NothingPrioritized);
        }
        if discarded.is_empty() {
            return Err(SelectionError::NothingDiscarded);
        }

        Ok(Self {
            underwriter_name: underwriter_name.to_string(),
            prioritized_ids: prioritized.into_iter().collect(),
            discarded_ids: discarded.into_iter().collect(),
        })
    }

    pub fn selections(&self) -> UserSelection {
        let mut selections = UserSelection::new();
        for id in &self.prioritized_ids {
            selections.insert(*id, SelectionState::Prioritized);
        }
        for id in &self.discarded_ids {
            selections.insert(*id, SelectionState::Discarded);
        }
        selections
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("underwriter name is required")]
    MissingUnderwriterName,
    #[error("select at least one property to prioritize")]
    NothingPrioritized,
    #[error("select at least one property to discard")]
    NothingDiscarded,
    #[error("property IDs cannot be both prioritized and discarded: {}", format_ids(.0))]
    Conflict(Vec<PropertyId>),
    #[error("received {supplied} selections but the round has {available} properties")]
    TooManySelections { supplied: usize, available: usize },
}

fn format_ids(ids: &[PropertyId]) -> String {
    ids.iter()
        .map(PropertyId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
