//! Per-owner action cache and aggregate state flags.

use super::proto::ProtoModel;
use super::schema::Schema;
use crate::action::{Action, ActionDef, ErasedAction};
use crate::core::{ActionBits, ActionId, ActionState};
use crate::error::{ActionError, InternalError};
use crate::reactive::{Computed, Observable, Scope};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Identifier of one model instance, used in log fields and snapshots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(Uuid);

impl ModelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One observable [`ActionBits`] per state: bit `n` of the set for state `s`
/// is on while the action with id `n` is in `s`.
pub struct StateFlags {
    slots: [Observable<ActionBits>; 5],
}

impl StateFlags {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Observable::new(ActionBits::new())),
        }
    }

    /// Move the bit of `id` to the set of `state`.
    pub(crate) fn mark(&self, id: ActionId, state: ActionState) {
        for candidate in ActionState::ALL {
            let value = candidate == state;
            self.slots[candidate.index()].update(|bits| *bits = bits.with(id, value));
        }
    }

    pub fn get(&self, state: ActionState) -> ActionBits {
        self.slots[state.index()].get()
    }

    /// Whether any action is in `state`.
    pub fn any(&self, state: ActionState) -> bool {
        self.slots[state.index()].with(|bits| !bits.is_empty())
    }

    pub fn observable(&self, state: ActionState) -> &Observable<ActionBits> {
        &self.slots[state.index()]
    }
}

impl fmt::Debug for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for state in ActionState::ALL {
            map.entry(&state.name(), &self.get(state));
        }
        map.finish()
    }
}

/// Bookkeeping a model embeds to own its actions.
///
/// Holds one action per definition, created lazily and cached for the
/// owner's lifetime, assigns action ids starting at 1, and keeps the
/// aggregate [`StateFlags`]. Observers the owner registers through
/// [`Registry::watch`] and [`Registry::computed`] live in the registry's
/// [`Scope`] until [`Registry::destroy`].
pub struct Registry<M> {
    model_id: ModelId,
    actions: Mutex<HashMap<TypeId, Arc<dyn ErasedAction>>>,
    last_id: AtomicUsize,
    flags: Arc<StateFlags>,
    scope: Scope,
    set_up: AtomicBool,
    _owner: PhantomData<fn() -> M>,
}

impl<M> Registry<M> {
    pub fn new() -> Self {
        Self {
            model_id: ModelId::new(),
            actions: Mutex::new(HashMap::new()),
            last_id: AtomicUsize::new(0),
            flags: Arc::new(StateFlags::new()),
            scope: Scope::new(),
            set_up: AtomicBool::new(false),
            _owner: PhantomData,
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn flags(&self) -> &StateFlags {
        &self.flags
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of actions created so far.
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_pending_actions(&self) -> bool {
        self.flags.any(ActionState::Pending)
    }

    pub fn has_action_with_error(&self) -> bool {
        self.flags.any(ActionState::Error)
    }

    /// Follows [`Registry::has_pending_actions`].
    pub fn watch_pending(&self) -> Computed<bool> {
        self.computed(self.flags.observable(ActionState::Pending), |bits| {
            !bits.is_empty()
        })
    }

    /// Follows [`Registry::has_action_with_error`].
    pub fn watch_errors(&self) -> Computed<bool> {
        self.computed(self.flags.observable(ActionState::Error), |bits| {
            !bits.is_empty()
        })
    }

    /// Run `callback(new, old)` on every change of `source` until the model
    /// is destroyed.
    pub fn watch<T, F>(&self, source: &Observable<T>, callback: F)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.scope.keep(source.subscribe(callback));
    }

    /// Like [`Registry::watch`], also running `callback(current, current)`
    /// right away.
    pub fn watch_immediate<T, F>(&self, source: &Observable<T>, callback: F)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let observer = Arc::clone(&callback);
        self.scope
            .keep(source.subscribe(move |new, old| observer(new, old)));
        let current = source.get();
        callback(&current, &current);
    }

    /// Derive a value from `source` that stops tracking when the model is
    /// destroyed.
    pub fn computed<S, T, F>(&self, source: &Observable<S>, derive: F) -> Computed<T>
    where
        S: Clone + PartialEq + Send + Sync + 'static,
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let computed = Computed::new(source, derive);
        self.scope.keep(computed.detach_handle());
        computed
    }

    /// Dispose every observer registered through this registry.
    pub fn destroy(&self) {
        trace!(model = %self.model_id, "destroying model scope");
        self.scope.dispose();
    }

    pub fn is_destroyed(&self) -> bool {
        self.scope.is_disposed()
    }

    /// `true` for the first caller only; guards `ProtoModel::setup`.
    pub(crate) fn claim_setup(&self) -> bool {
        !self.set_up.swap(true, Ordering::AcqRel)
    }

    /// Actions created so far, ordered by id.
    pub(crate) fn created(&self) -> Vec<Arc<dyn ErasedAction>> {
        let mut actions: Vec<_> = self.actions.lock().values().cloned().collect();
        actions.sort_by_key(|action| action.core().id());
        actions
    }

    /// Captured errors of every action in `error`, ordered by action id.
    pub(crate) fn errors(&self) -> Vec<ActionError> {
        self.created()
            .iter()
            .filter_map(|action| action.core().error())
            .collect()
    }
}

impl<M: ProtoModel> Registry<M> {
    /// Cached action of definition `D`, created on first use.
    pub(crate) fn action<D: ActionDef<M>>(
        &self,
        owner: &Arc<M>,
    ) -> Result<Arc<Action<M, D>>, InternalError> {
        let key = TypeId::of::<D>();
        if let Some(found) = self.cached::<D>(key) {
            return Ok(found);
        }

        Schema::<M>::of()?.check::<D>()?;

        let created = {
            let mut actions = self.actions.lock();
            if let Some(existing) = actions.get(&key) {
                return Self::downcast::<D>(Arc::clone(existing));
            }
            let id = ActionId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
            let action = Arc::new(Action::<M, D>::new(
                Arc::downgrade(owner),
                id,
                Arc::clone(&self.flags),
            ));
            actions.insert(key, Arc::clone(&action) as Arc<dyn ErasedAction>);
            action
        };

        trace!(model = %self.model_id, action = D::NAME, id = %created.id(), "action created");
        created.announce();
        Ok(created)
    }

    /// Type-erased entry point stored in the schema for lookups by name.
    pub(crate) fn create_erased<D: ActionDef<M>>(
        &self,
        owner: &Arc<M>,
    ) -> Result<Arc<dyn ErasedAction>, InternalError> {
        let action = self.action::<D>(owner)?;
        Ok(action)
    }

    fn cached<D: ActionDef<M>>(&self, key: TypeId) -> Option<Arc<Action<M, D>>> {
        let existing = self.actions.lock().get(&key).cloned()?;
        Self::downcast::<D>(existing).ok()
    }

    fn downcast<D: ActionDef<M>>(
        erased: Arc<dyn ErasedAction>,
    ) -> Result<Arc<Action<M, D>>, InternalError> {
        erased
            .into_any()
            .downcast::<Action<M, D>>()
            .map_err(|_| InternalError::NotAnAction {
                name: D::NAME.to_string(),
            })
    }
}

impl<M> Default for Registry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Registry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("model_id", &self.model_id)
            .field("actions", &self.len())
            .field("flags", &*self.flags)
            .finish()
    }
}
