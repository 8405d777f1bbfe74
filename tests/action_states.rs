//! State-by-state behaviour of a single action.

mod common;

use common::{
    create_test_model, init_tracing, record_states, ActionWithAbort, ApiMock, SingleErrorAction,
    SuccessActionWithArgs, SuccessActionWithoutArgs, SyncErrorAction, SyncVoidAction,
};
use modeler::prelude::*;
use modeler::{Error, StatusConflictError};
use serde_json::json;

mod ready {
    use super::*;

    #[tokio::test]
    async fn starts_ready_with_empty_payload() {
        init_tracing();
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();

        assert!(action.is_ready());
        assert!(action.is(&[ActionState::Ready, ActionState::Lock]));
        assert!(action.error().is_none());
        assert!(action.abort_reason().is_none());
        assert!(action.promise().is_none());
        assert!(action.cancellation_handle().is_none());
        assert!(action.args().is_none());
    }

    #[tokio::test]
    async fn exec_enters_pending_before_the_operation_runs() {
        let api = ApiMock::new();
        let model = create_test_model(api.clone());
        let action = model.action::<SuccessActionWithArgs>().unwrap();

        let promise = action.exec((7, "seven".to_string())).unwrap();
        assert!(action.is_pending());
        assert!(api.requests().is_empty());
        assert_eq!(action.args(), Some((7, "seven".to_string())));

        promise.await.unwrap();
        assert!(action.is_ready());
        assert_eq!(api.requests(), vec!["7:seven".to_string()]);
    }

    #[tokio::test]
    async fn observers_see_pending_then_ready() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        let (states, _subscription) = record_states(&action);

        action.exec(()).unwrap().await.unwrap();

        assert_eq!(*states.lock(), vec![ActionState::Pending, ActionState::Ready]);
    }

    #[tokio::test]
    async fn cancel_does_nothing() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        let (states, _subscription) = record_states(&action);

        let promise = action.cancel(Some("ignored".into()));
        assert!(promise.is_settled());
        promise.await.unwrap();

        assert!(action.is_ready());
        assert!(states.lock().is_empty());
    }

    #[tokio::test]
    async fn unlock_and_reset_error_conflict() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();

        let unlock = action.unlock().unwrap_err();
        assert_eq!(
            unlock.to_string(),
            "Trying to update state of success_action_without_args from ready to ready"
        );
        assert!(action.reset_error().is_err());
        assert!(action.is_ready());
    }

    #[tokio::test]
    async fn sync_operation_settles_inside_exec() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SyncVoidAction>().unwrap();
        let (states, _subscription) = record_states(&action);

        let promise = action.exec(()).unwrap();
        assert!(action.is_ready());
        assert!(action.promise().is_none());
        promise.await.unwrap();

        assert_eq!(*states.lock(), vec![ActionState::Pending, ActionState::Ready]);
    }
}

mod pending {
    use super::*;

    #[tokio::test]
    async fn exposes_the_promise_and_handle() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();

        let promise = action.exec(()).unwrap();
        assert!(action.promise().unwrap().ptr_eq(&promise));
        assert!(!action.cancellation_handle().unwrap().is_cancelled());

        promise.await.unwrap();
        assert!(action.promise().is_none());
    }

    #[tokio::test]
    async fn exec_conflicts() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();

        let promise = action.exec(()).unwrap();
        let error = action.exec(()).unwrap_err();
        assert_eq!(
            error,
            Error::StatusConflict(StatusConflictError {
                name: "success_action_without_args".to_string(),
                from: ActionState::Pending,
                to: ActionState::Pending,
            })
        );
        assert_eq!(
            error.to_string(),
            "Trying to update state of success_action_without_args from pending to pending"
        );

        promise.await.unwrap();
        assert!(action.is_ready());
    }

    #[tokio::test]
    async fn unlock_conflicts() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();

        let promise = action.exec(()).unwrap();
        let error = action.unlock().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Trying to update state of success_action_without_args from pending to ready"
        );
        assert!(action.is_pending());
        promise.await.unwrap();
    }

    #[tokio::test]
    async fn lock_returns_the_running_promise() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();
        let (states, _subscription) = record_states(&action);

        let promise = action.exec(()).unwrap();
        let locked = action.lock();
        assert!(locked.ptr_eq(&promise));
        assert!(action.is_pending());

        promise.await.unwrap();
        assert!(action.is_lock());
        assert!(action.abort_reason().is_none());
        assert_eq!(*states.lock(), vec![ActionState::Pending, ActionState::Lock]);
    }

    #[tokio::test]
    async fn cancel_returns_the_running_promise() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();

        let promise = action.exec(()).unwrap();
        let cancelled = action.cancel(Some("Abort reason".into()));
        assert!(cancelled.ptr_eq(&promise));

        promise.await.unwrap();
        assert!(action.is_abort());
        assert_eq!(action.abort_reason(), Some(AbortReason::from("Abort reason")));
    }

    #[tokio::test]
    async fn first_cancellation_wins() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();

        let promise = action.exec(()).unwrap();
        action.cancel(Some("first".into()));
        action.lock();
        promise.await.unwrap();

        assert!(action.is_abort());
        assert_eq!(action.abort_reason().unwrap().as_str(), Some("first"));
    }

    #[tokio::test]
    async fn cancelled_operation_can_run_again() {
        let api = ApiMock::new();
        let model = create_test_model(api.clone());
        let action = model.action::<ActionWithAbort>().unwrap();

        let first = action.exec(()).unwrap();
        action.cancel(None);
        first.clone().await.unwrap();

        let second = action.exec(()).unwrap();
        assert!(!second.ptr_eq(&first));
        assert!(!action.cancellation_handle().unwrap().is_cancelled());
        action.cancel(None).await.unwrap();
        assert_eq!(api.requests().len(), 2);
    }
}

mod error {
    use super::*;

    #[tokio::test]
    async fn failure_is_captured_and_the_promise_resolves() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SingleErrorAction>().unwrap();
        let (states, _subscription) = record_states(&action);

        action.exec(()).unwrap().await.unwrap();

        assert!(action.is_error());
        let error = action.error().unwrap();
        assert_eq!(error.action_name(), "single_error_action");
        assert_eq!(error.cause().to_string(), "x");
        assert_eq!(error.to_string(), "Action single_error_action throw error: x");
        assert!(error.is_for::<common::TestModel, SingleErrorAction>());
        assert_eq!(*states.lock(), vec![ActionState::Pending, ActionState::Error]);
    }

    #[tokio::test]
    async fn sync_failure_is_captured_too() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SyncErrorAction>().unwrap();

        action.exec(()).unwrap().await.unwrap();

        assert!(action.is_error());
        assert_eq!(action.error().unwrap().cause().to_string(), "sync failure");
    }

    #[tokio::test]
    async fn reset_error_returns_to_ready() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SingleErrorAction>().unwrap();
        action.exec(()).unwrap().await.unwrap();

        action.reset_error().unwrap();

        assert!(action.is_ready());
        assert!(action.error().is_none());
    }

    #[tokio::test]
    async fn exec_clears_the_error() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SingleErrorAction>().unwrap();
        action.exec(()).unwrap().await.unwrap();
        let first = action.error().unwrap();

        let promise = action.exec(()).unwrap();
        assert!(action.is_pending());
        assert!(action.error().is_none());
        promise.await.unwrap();

        assert!(!action.error().unwrap().ptr_eq(&first));
    }

    #[tokio::test]
    async fn lock_drops_the_error() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SingleErrorAction>().unwrap();
        action.exec(()).unwrap().await.unwrap();

        action.lock().await.unwrap();

        assert!(action.is_lock());
        assert!(action.error().is_none());
    }
}

mod lock {
    use super::*;

    #[tokio::test]
    async fn lock_is_immediate_when_idle() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        let (states, _subscription) = record_states(&action);

        action.lock().await.unwrap();

        assert!(action.is_lock());
        assert_eq!(*states.lock(), vec![ActionState::Lock]);
    }

    #[tokio::test]
    async fn exec_conflicts_while_locked() {
        let api = ApiMock::new();
        let model = create_test_model(api.clone());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        action.lock();

        let error = action.exec(()).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Trying to update state of success_action_without_args from lock to pending"
        );
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn unlock_returns_to_ready() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        action.lock();

        action.unlock().unwrap();

        assert!(action.is_ready());
        action.exec(()).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_is_ignored() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<SuccessActionWithoutArgs>().unwrap();
        action.lock();

        let promise = action.cancel(None);
        assert!(promise.is_settled());
        promise.await.unwrap();

        assert!(action.is_lock());
    }
}

mod abort {
    use super::*;

    #[tokio::test]
    async fn reason_is_kept_until_the_next_run() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();
        let promise = action.exec(()).unwrap();
        action.cancel(Some(json!({ "code": 7 }).into()));
        promise.await.unwrap();

        assert!(action.is_abort());
        assert_eq!(action.abort_reason().unwrap().value(), &json!({ "code": 7 }));

        let promise = action.exec(()).unwrap();
        assert!(action.abort_reason().is_none());
        action.cancel(None);
        promise.await.unwrap();
        assert!(action.is_abort());
        assert!(action.abort_reason().is_none());
    }

    #[tokio::test]
    async fn lock_leaves_abort() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();
        let promise = action.exec(()).unwrap();
        action.cancel(None);
        promise.await.unwrap();

        action.lock();

        assert!(action.is_lock());
        assert!(action.abort_reason().is_none());
    }

    #[tokio::test]
    async fn reset_error_conflicts() {
        let model = create_test_model(ApiMock::new());
        let action = model.action::<ActionWithAbort>().unwrap();
        let promise = action.exec(()).unwrap();
        action.cancel(None);
        promise.await.unwrap();

        let error = action.reset_error().unwrap_err();

        assert!(matches!(
            error,
            Error::StatusConflict(StatusConflictError { from: ActionState::Abort, .. })
        ));
    }
}
