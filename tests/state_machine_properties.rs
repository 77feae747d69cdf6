//! Property tests for the forward-only task lifecycle

use katello_tasks::client::RemoteJobState;
use katello_tasks::database::InMemoryTaskStore;
use katello_tasks::models::{NewTaskRecord, OwnerRef, TaskParameters, TaskType};
use katello_tasks::state_machine::{TaskRecordStore, TaskStateMachine, TransitionDecision};
use katello_tasks::TaskState;
use proptest::prelude::*;
use serde_json::json;

fn state_strategy() -> impl Strategy<Value = TaskState> {
    prop::sample::select(TaskState::ALL.to_vec())
}

fn result_strategy() -> impl Strategy<Value = Option<serde_json::Value>> {
    prop::option::of(prop_oneof![
        Just(json!({"status": "success"})),
        Just(json!({"error": "boom"})),
    ])
}

proptest! {
    /// Property: an applied decision always moves strictly up the ordering
    #[test]
    fn applied_transitions_increase_rank(from in state_strategy(), to in state_strategy()) {
        if let Ok(TransitionDecision::Apply) = TaskStateMachine::evaluate(from, None, to, None) {
            prop_assert!(to.rank() > from.rank());
            prop_assert!(!from.is_terminal());
        }
    }

    /// Property: terminal states accept nothing but an identical repeat
    #[test]
    fn terminal_states_are_final(from in state_strategy(), to in state_strategy(), result in result_strategy()) {
        prop_assume!(from.is_terminal());
        let decision = TaskStateMachine::evaluate(from, result.as_ref(), to, result.as_ref());
        if from == to {
            prop_assert_eq!(decision.unwrap(), TransitionDecision::Confirmed);
        } else {
            prop_assert!(decision.is_err());
        }
    }

    /// Property: whatever sequence of transitions is requested, the stored state never
    /// regresses and at most one request applies a terminal state
    #[test]
    fn stored_state_never_regresses(requests in prop::collection::vec((state_strategy(), result_strategy()), 1..12)) {
        tokio_test::block_on(async {
            let store = InMemoryTaskStore::new();
            let record = store
                .create(
                    NewTaskRecord::builder()
                        .owner(OwnerRef::system(1))
                        .task_type(TaskType::PackageInstall)
                        .parameters(TaskParameters::Packages(vec!["zsh".to_string()]))
                        .remote_handle("R1", RemoteJobState::Waiting)
                        .build(),
                )
                .await
                .unwrap();

            let mut rank = record.state.rank();
            let mut terminal_applications = 0;
            for (to, result) in requests {
                if let Ok(outcome) = store.transition(record.id, to, result).await {
                    if outcome.is_terminal_application() {
                        terminal_applications += 1;
                    }
                }
                let current = store.find(record.id).await.unwrap();
                assert!(current.state.rank() >= rank);
                rank = current.state.rank();
            }
            assert!(terminal_applications <= 1);
        });
    }
}
