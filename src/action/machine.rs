//! Argument-independent half of an action: state, payload and transitions.

use super::cancellation::{AbortReason, CancellationHandle, Cancelled};
use super::promise::ActionPromise;
use crate::core::{step, ActionId, ActionState, Operation, Step};
use crate::error::{ActionError, Error, StatusConflictError, UnexpectedAbortError};
use crate::model::StateFlags;
use crate::reactive::{Observable, Subscription};
use crate::snapshot::ActionSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

enum Payload {
    Idle,
    Pending {
        handle: CancellationHandle,
        promise: Option<ActionPromise>,
    },
    Failed(ActionError),
    Aborted(Option<AbortReason>),
}

struct Slot {
    state: ActionState,
    payload: Payload,
    updated_at: DateTime<Utc>,
    // Bumped on every transition; orders publication.
    version: u64,
}

/// How an operation ended, classified by the kind of its error.
enum Settlement {
    Resolve,
    Reject(anyhow::Error),
    Cancelled,
    Fault(Error),
}

impl Settlement {
    fn classify(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Settlement::Resolve,
            Err(error) if error.is::<Cancelled>() => Settlement::Cancelled,
            Err(error) => match Error::from_operation(error) {
                Ok(rethrown) => Settlement::Fault(rethrown),
                Err(cause) => Settlement::Reject(cause),
            },
        }
    }
}

/// State machine shared by every action regardless of its arguments.
///
/// The slot mutex is the source of truth and is never held while observers
/// run. After each transition the state observable is updated first, then
/// the owner's aggregate flags. Transitions are published in slot order: a
/// transition overtaken by a later one on another thread is not published.
pub struct ActionCore {
    id: ActionId,
    name: &'static str,
    state: Observable<ActionState>,
    slot: Mutex<Slot>,
    // Version of the last published transition.
    published: ReentrantMutex<Cell<u64>>,
    flags: Arc<StateFlags>,
}

impl ActionCore {
    pub(crate) fn new(id: ActionId, name: &'static str, flags: Arc<StateFlags>) -> Self {
        Self {
            id,
            name,
            state: Observable::new(ActionState::Ready),
            slot: Mutex::new(Slot {
                state: ActionState::Ready,
                payload: Payload::Idle,
                updated_at: Utc::now(),
                version: 0,
            }),
            published: ReentrantMutex::new(Cell::new(0)),
            flags,
        }
    }

    /// Record the initial state in the owner's flags.
    pub(crate) fn announce(&self) {
        let published = self.published.lock();
        if published.get() == 0 {
            self.flags.mark(self.id, ActionState::Ready);
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Name of the method this action runs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ActionState {
        self.slot.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ActionState::Ready
    }

    pub fn is_pending(&self) -> bool {
        self.state() == ActionState::Pending
    }

    pub fn is_error(&self) -> bool {
        self.state() == ActionState::Error
    }

    pub fn is_lock(&self) -> bool {
        self.state() == ActionState::Lock
    }

    pub fn is_abort(&self) -> bool {
        self.state() == ActionState::Abort
    }

    /// Membership test against a list of states.
    pub fn is(&self, states: &[ActionState]) -> bool {
        self.state().is_one_of(states)
    }

    /// Captured error while in `error`.
    pub fn error(&self) -> Option<ActionError> {
        match &self.slot.lock().payload {
            Payload::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Reason given to `cancel` while in `abort`.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match &self.slot.lock().payload {
            Payload::Aborted(reason) => reason.clone(),
            _ => None,
        }
    }

    /// Promise of the execution in flight.
    pub fn promise(&self) -> Option<ActionPromise> {
        match &self.slot.lock().payload {
            Payload::Pending { promise, .. } => promise.clone(),
            _ => None,
        }
    }

    /// Cancellation handle of the execution in flight.
    pub fn cancellation_handle(&self) -> Option<CancellationHandle> {
        match &self.slot.lock().payload {
            Payload::Pending { handle, .. } => Some(handle.clone()),
            _ => None,
        }
    }

    /// Time of the last transition.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.slot.lock().updated_at
    }

    /// Observable state, for bindings that want to follow it.
    pub fn state_observable(&self) -> &Observable<ActionState> {
        &self.state
    }

    /// Register `callback(new, old)` for every state change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ActionState, ActionState) + Send + Sync + 'static,
    {
        self.state.subscribe(move |new, old| callback(*new, *old))
    }

    /// Serializable view of the current state.
    pub fn snapshot(&self) -> ActionSnapshot {
        let slot = self.slot.lock();
        let (error, abort_reason) = match &slot.payload {
            Payload::Failed(error) => (Some(error.cause().to_string()), None),
            Payload::Aborted(reason) => (None, reason.clone()),
            _ => (None, None),
        };
        ActionSnapshot {
            id: self.id,
            name: self.name.to_string(),
            state: slot.state,
            error,
            abort_reason,
            updated_at: slot.updated_at,
        }
    }

    /// Stop the action from running. A running execution is cancelled and
    /// settles into `lock`; its promise is returned. Otherwise the action
    /// enters `lock` right away.
    pub fn lock(&self) -> ActionPromise {
        let mut slot = self.slot.lock();
        let from = slot.state;
        match step(from, Operation::Lock) {
            Step::Interrupt => {
                debug!(action = self.name, id = %self.id, "locking running action");
                Self::interrupt(slot, CancellationHandle::abort_for_lock)
            }
            Step::Enter(to) => {
                let version = Self::enter(&mut slot, to, Payload::Idle);
                drop(slot);
                self.publish(from, to, version);
                ActionPromise::resolved()
            }
            _ => ActionPromise::resolved(),
        }
    }

    /// Leave `lock`.
    pub fn unlock(&self) -> Result<(), Error> {
        self.leave(Operation::Unlock)
    }

    /// Clear the captured error and return to `ready`.
    pub fn reset_error(&self) -> Result<(), Error> {
        self.leave(Operation::ResetError)
    }

    /// Cancel the running execution and return its promise. Does nothing
    /// unless the action is pending.
    pub fn cancel(&self, reason: Option<AbortReason>) -> ActionPromise {
        let slot = self.slot.lock();
        match step(slot.state, Operation::Cancel) {
            Step::Interrupt => {
                debug!(action = self.name, id = %self.id, ?reason, "cancelling running action");
                Self::interrupt(slot, move |handle| handle.abort(reason))
            }
            _ => ActionPromise::resolved(),
        }
    }

    /// Enter `pending` for an execution driven by `handle`.
    pub(crate) fn begin(&self, handle: CancellationHandle) -> Result<(), StatusConflictError> {
        let mut slot = self.slot.lock();
        let from = slot.state;
        match step(from, Operation::Exec) {
            Step::Enter(to) => {
                let version = Self::enter(
                    &mut slot,
                    to,
                    Payload::Pending {
                        handle,
                        promise: None,
                    },
                );
                drop(slot);
                self.publish(from, to, version);
                Ok(())
            }
            refused => Err(self.conflict(from, refused, ActionState::Pending)),
        }
    }

    /// Remember the promise of the execution driven by `handle`.
    pub(crate) fn attach(&self, handle: &CancellationHandle, promise: &ActionPromise) {
        let mut slot = self.slot.lock();
        if let Payload::Pending {
            handle: current,
            promise: stored,
        } = &mut slot.payload
        {
            if current.ptr_eq(handle) {
                *stored = Some(promise.clone());
            }
        }
    }

    /// Settle the execution driven by `handle` with the operation's result.
    pub(crate) fn settle(
        &self,
        handle: &CancellationHandle,
        result: anyhow::Result<()>,
    ) -> Result<(), Error> {
        let mut slot = self.slot.lock();
        let from = slot.state;

        match Settlement::classify(result) {
            Settlement::Resolve => {
                let to = self.expect_enter(from, Operation::Resolve)?;
                let version = Self::enter(&mut slot, to, Payload::Idle);
                drop(slot);
                self.publish(from, to, version);
                Ok(())
            }
            Settlement::Reject(cause) => match step(from, Operation::Reject) {
                Step::Enter(to) => {
                    let captured = ActionError::new(self.name, cause);
                    warn!(action = self.name, id = %self.id, error = %captured.cause(), "action failed");
                    let version = Self::enter(&mut slot, to, Payload::Failed(captured));
                    drop(slot);
                    self.publish(from, to, version);
                    Ok(())
                }
                refused => {
                    drop(slot);
                    let conflict = self.conflict(from, refused, ActionState::Error);
                    error!(action = self.name, id = %self.id, %conflict, "failure arrived outside pending");
                    Err(conflict.into())
                }
            },
            Settlement::Cancelled => {
                let by_lock = handle.is_locked();
                match step(from, Operation::RejectCancelled { by_lock }) {
                    Step::Enter(ActionState::Lock) => {
                        let version = Self::enter(&mut slot, ActionState::Lock, Payload::Idle);
                        drop(slot);
                        self.publish(from, ActionState::Lock, version);
                        Ok(())
                    }
                    Step::Enter(to) => {
                        let version = Self::enter(&mut slot, to, Payload::Aborted(handle.reason()));
                        drop(slot);
                        self.publish(from, to, version);
                        Ok(())
                    }
                    _ => {
                        drop(slot);
                        let unexpected = UnexpectedAbortError {
                            name: self.name.to_string(),
                            state: from,
                        };
                        error!(action = self.name, id = %self.id, %unexpected, "cancellation arrived outside pending");
                        Err(unexpected.into())
                    }
                }
            }
            Settlement::Fault(fault) => {
                let to = self.expect_enter(from, Operation::Fault)?;
                let version = Self::enter(&mut slot, to, Payload::Idle);
                drop(slot);
                self.publish(from, to, version);
                error!(action = self.name, id = %self.id, error = %fault, "action raised a rethrown error");
                Err(fault)
            }
        }
    }

    fn leave(&self, operation: Operation) -> Result<(), Error> {
        let mut slot = self.slot.lock();
        let from = slot.state;
        match step(from, operation) {
            Step::Enter(to) => {
                let version = Self::enter(&mut slot, to, Payload::Idle);
                drop(slot);
                self.publish(from, to, version);
                Ok(())
            }
            refused => Err(self.conflict(from, refused, ActionState::Ready).into()),
        }
    }

    fn expect_enter(&self, from: ActionState, operation: Operation) -> Result<ActionState, Error> {
        match step(from, operation) {
            Step::Enter(to) => Ok(to),
            refused => Err(self.conflict(from, refused, ActionState::Ready).into()),
        }
    }

    fn interrupt(
        slot: MutexGuard<'_, Slot>,
        cancel: impl FnOnce(&CancellationHandle) -> bool,
    ) -> ActionPromise {
        let (handle, promise) = match &slot.payload {
            Payload::Pending { handle, promise } => (handle.clone(), promise.clone()),
            _ => return ActionPromise::resolved(),
        };
        drop(slot);
        cancel(&handle);
        promise.unwrap_or_else(ActionPromise::resolved)
    }

    fn enter(slot: &mut Slot, to: ActionState, payload: Payload) -> u64 {
        slot.state = to;
        slot.payload = payload;
        slot.updated_at = Utc::now();
        slot.version += 1;
        slot.version
    }

    fn publish(&self, from: ActionState, to: ActionState, version: u64) {
        debug!(action = self.name, id = %self.id, %from, %to, "action state changed");
        let published = self.published.lock();
        if published.get() >= version {
            return;
        }
        published.set(version);
        self.state.set(to);
        // An observer may have published a newer transition meanwhile.
        if published.get() == version {
            self.flags.mark(self.id, to);
        }
    }

    fn conflict(&self, from: ActionState, refused: Step, fallback: ActionState) -> StatusConflictError {
        let to = match refused {
            Step::Conflict { target } => target,
            _ => fallback,
        };
        StatusConflictError {
            name: self.name.to_string(),
            from,
            to,
        }
    }
}

impl fmt::Debug for ActionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Defect;
    use std::sync::Mutex as StdMutex;

    fn core() -> ActionCore {
        let core = ActionCore::new(ActionId(1), "load", Arc::new(StateFlags::new()));
        core.announce();
        core
    }

    fn started(core: &ActionCore) -> CancellationHandle {
        let handle = CancellationHandle::new();
        core.begin(handle.clone()).unwrap();
        handle
    }

    #[test]
    fn starts_ready_and_empty() {
        let core = core();
        assert!(core.is_ready());
        assert!(core.error().is_none());
        assert!(core.abort_reason().is_none());
        assert!(core.promise().is_none());
        assert!(core.cancellation_handle().is_none());
    }

    #[test]
    fn begin_conflicts_while_pending() {
        let core = core();
        started(&core);
        let conflict = core.begin(CancellationHandle::new()).unwrap_err();
        assert_eq!(
            conflict.to_string(),
            "Trying to update state of load from pending to pending"
        );
    }

    #[test]
    fn ordinary_failure_is_captured() {
        let core = core();
        let handle = started(&core);
        core.settle(&handle, Err(anyhow::anyhow!("x"))).unwrap();

        assert!(core.is_error());
        assert_eq!(core.error().unwrap().cause().to_string(), "x");
        core.reset_error().unwrap();
        assert!(core.is_ready());
    }

    #[test]
    fn defect_is_rethrown_and_resets_to_ready() {
        let core = core();
        let handle = started(&core);
        let error = core.settle(&handle, Err(Defect::new("bug").into())).unwrap_err();
        assert_eq!(error, Error::Defect(Defect::new("bug")));
        assert!(core.is_ready());
    }

    #[test]
    fn cancellation_by_lock_enters_lock() {
        let core = core();
        let handle = started(&core);
        let _ = core.lock();
        assert!(core.is_pending());
        assert!(handle.is_cancelled());

        core.settle(&handle, Err(Cancelled.into())).unwrap();
        assert!(core.is_lock());
        core.unlock().unwrap();
        assert!(core.is_ready());
    }

    #[test]
    fn cancellation_with_reason_enters_abort() {
        let core = core();
        let handle = started(&core);
        let _ = core.cancel(Some("stop".into()));
        core.settle(&handle, Err(Cancelled.into())).unwrap();

        assert!(core.is_abort());
        assert_eq!(core.abort_reason(), Some(AbortReason::from("stop")));
    }

    #[test]
    fn cancellation_outside_pending_is_unexpected() {
        let core = core();
        let error = core
            .settle(&CancellationHandle::new(), Err(Cancelled.into()))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unexpected AbortError for the action load in state ready"
        );
    }

    #[test]
    fn attach_only_binds_the_current_execution() {
        let core = core();
        let handle = started(&core);
        let stale = ActionPromise::resolved();
        core.attach(&CancellationHandle::new(), &stale);
        assert!(core.promise().is_none());

        let current = ActionPromise::resolved();
        core.attach(&handle, &current);
        assert!(core.promise().unwrap().ptr_eq(&current));
        assert!(core.cancel(None).ptr_eq(&current));
    }

    #[test]
    fn unlock_and_reset_conflict_from_wrong_states() {
        let core = core();
        assert_eq!(
            core.unlock().unwrap_err().to_string(),
            "Trying to update state of load from ready to ready"
        );
        assert!(matches!(core.reset_error(), Err(Error::StatusConflict(_))));
    }

    #[test]
    fn observers_see_every_transition_in_order() {
        let core = core();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = core.subscribe(move |new, old| sink.lock().unwrap().push((old, new)));

        let handle = started(&core);
        core.settle(&handle, Ok(())).unwrap();
        let _ = core.lock();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (ActionState::Ready, ActionState::Pending),
                (ActionState::Pending, ActionState::Ready),
                (ActionState::Ready, ActionState::Lock),
            ]
        );
    }

    #[test]
    fn racing_transitions_leave_observers_consistent() {
        let flags = Arc::new(StateFlags::new());
        let core = ActionCore::new(ActionId(1), "load", Arc::clone(&flags));
        core.announce();

        std::thread::scope(|threads| {
            for worker in 0..8 {
                let core = &core;
                threads.spawn(move || {
                    for round in 0..500 {
                        let handle = CancellationHandle::new();
                        if core.begin(handle.clone()).is_err() {
                            continue;
                        }
                        let result = if (worker + round) % 3 == 0 {
                            Err(anyhow::anyhow!("x"))
                        } else {
                            Ok(())
                        };
                        let _ = core.settle(&handle, result);
                        let _ = core.reset_error();
                    }
                });
            }
        });

        let state = core.state();
        assert_eq!(core.state_observable().get(), state);
        for candidate in ActionState::ALL {
            assert_eq!(flags.get(candidate).contains(core.id()), candidate == state);
        }
    }

    #[test]
    fn snapshot_reports_captured_error() {
        let core = core();
        let handle = started(&core);
        core.settle(&handle, Err(anyhow::anyhow!("offline"))).unwrap();

        let snapshot = core.snapshot();
        assert_eq!(snapshot.state, ActionState::Error);
        assert_eq!(snapshot.error.as_deref(), Some("offline"));
        assert_eq!(snapshot.name, "load");
    }
}
