use super::*;

const STATES: [RunState; 5] = [
    RunState::Idle,
    RunState::Running,
    RunState::Pausing,
    RunState::Paused,
    RunState::Canceling,
];
const INTENTS: [Intent; 3] = [Intent::Run, Intent::Pause, Intent::Cancel];

#[test]
fn table_accepts_exactly_five_pairs() {
    let accepted: Vec<(RunState, Intent, RunState, Action)> = STATES
        .iter()
        .flat_map(|&s| INTENTS.iter().map(move |&i| (s, i)))
        .filter_map(|(s, i)| plan_transition(s, i).ok().map(|t| (s, i, t.to, t.action)))
        .collect();

    assert_eq!(
        accepted,
        vec![
            (RunState::Idle, Intent::Run, RunState::Running, Action::StartFresh),
            (RunState::Running, Intent::Pause, RunState::Pausing, Action::Stop),
            (RunState::Running, Intent::Cancel, RunState::Canceling, Action::Stop),
            (RunState::Paused, Intent::Run, RunState::Running, Action::Resume),
            (RunState::Paused, Intent::Cancel, RunState::Idle, Action::FoldBack),
        ]
    );
}

#[test]
fn rejected_pairs_report_intent_and_state() {
    for &state in &STATES {
        for &intent in &INTENTS {
            let Err(err) = plan_transition(state, intent) else {
                continue;
            };
            match err {
                WatermarkError::InvalidTransition {
                    intent: i,
                    state: s,
                } => {
                    assert_eq!(i, intent);
                    assert_eq!(s, state);
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }
}

#[test]
fn transient_states_reject_everything() {
    for &intent in &INTENTS {
        assert!(plan_transition(RunState::Pausing, intent).is_err());
        assert!(plan_transition(RunState::Canceling, intent).is_err());
    }
}

#[test]
fn drained_pause_and_cancel_resolve() {
    assert_eq!(
        resolve_drained(RunState::Pausing, false),
        Resolution {
            state: RunState::Paused,
            fold_back: false
        }
    );
    assert_eq!(
        resolve_drained(RunState::Canceling, false),
        Resolution {
            state: RunState::Idle,
            fold_back: true
        }
    );
}

#[test]
fn completion_wins_over_pending_pause_or_cancel() {
    for state in [RunState::Running, RunState::Pausing, RunState::Canceling] {
        assert_eq!(
            resolve_drained(state, true),
            Resolution {
                state: RunState::Idle,
                fold_back: false
            }
        );
    }
}

#[test]
fn settled_states_are_left_alone() {
    assert_eq!(resolve_drained(RunState::Paused, false).state, RunState::Paused);
    assert_eq!(resolve_drained(RunState::Idle, true).state, RunState::Idle);
}
