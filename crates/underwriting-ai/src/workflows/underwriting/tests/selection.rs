use crate::workflows::underwriting::domain::{PropertyId, SelectionState};
use crate::workflows::underwriting::selection::{
    BoardState, SelectionBoard, SelectionError, SelectionMode, SubmissionDraft,
};

const A: PropertyId = PropertyId(1);
const B: PropertyId = PropertyId(2);
const C: PropertyId = PropertyId(3);

#[test]
fn single_choice_mode_clears_the_other_state() {
    let mut board = SelectionBoard::new(SelectionMode::SingleChoice);
    board.toggle_prioritized(A);
    assert_eq!(board.state(A), BoardState::Prioritized);

    board.toggle_discarded(A);
    assert_eq!(board.state(A), BoardState::Discarded);
    assert!(board.conflicts().is_empty());

    board.toggle_discarded(A);
    assert_eq!(board.state(A), BoardState::Unset);
}

#[test]
fn independent_toggles_surface_conflicts() {
    let mut board = SelectionBoard::new(SelectionMode::IndependentToggle);
    board.toggle_prioritized(A);
    board.toggle_discarded(A);
    board.toggle_discarded(B);

    assert_eq!(board.state(A), BoardState::Conflict);
    assert_eq!(board.conflicts(), vec![A]);

    match board.draft("Jordan") {
        Err(SelectionError::Conflict(ids)) => assert_eq!(ids, vec![A]),
        other => panic!("expected conflict, got {other:?}"),
    }

    board.clear(A);
    board.toggle_prioritized(C);
    let draft = board.draft("Jordan").expect("conflict resolved");
    assert_eq!(draft.prioritized_ids, vec![C]);
    assert_eq!(draft.discarded_ids, vec![B]);
}

#[test]
fn conflict_message_lists_letters() {
    let err = SubmissionDraft::new("Jordan", vec![A, B], vec![B, A]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "property IDs cannot be both prioritized and discarded: A, B"
    );
}

#[test]
fn draft_requires_name_and_both_lists() {
    assert_eq!(
        SubmissionDraft::new("   ", vec![A], vec![B]),
        Err(SelectionError::MissingUnderwriterName)
    );
    assert_eq!(
        SubmissionDraft::new("Jordan", Vec::new(), vec![B]),
        Err(SelectionError::NothingPrioritized)
    );
    assert_eq!(
        SubmissionDraft::new("Jordan", vec![A], Vec::new()),
        Err(SelectionError::NothingDiscarded)
    );
}

#[test]
fn draft_trims_name_and_deduplicates_ids() {
    let draft = SubmissionDraft::new(" Jordan ", vec![C, A, A], vec![B])
        .expect("valid draft");
    assert_eq!(draft.underwriter_name, "Jordan");
    assert_eq!(draft.prioritized_ids, vec![A, C]);

    let selections = draft.selections();
    assert_eq!(selections.get(&A), Some(&SelectionState::Prioritized));
    assert_eq!(selections.get(&B), Some(&SelectionState::Discarded));
    assert_eq!(selections.get(&PropertyId(4)), None);
}
