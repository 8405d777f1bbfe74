use super::proto::ProtoModel;
use super::schema::Schema;
use crate::action::{Action, ActionDef, ActionPromise, DynAction};
use crate::error::{Error, InternalError, ModelError};
use crate::snapshot::{ModelSnapshot, SNAPSHOT_VERSION};
use chrono::Utc;
use std::any::TypeId;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Public handle to a wrapped model.
///
/// Derefs to the owner, so fields and plain methods are reached directly;
/// actions are reached through [`Model::action`] or
/// [`Model::action_by_name`] and are the same `Arc` on every lookup.
pub struct Model<M> {
    inner: Arc<M>,
}

impl<M> Clone for Model<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ProtoModel> Model<M> {
    /// Wrap `owner`, failing if its schema is misconfigured.
    pub fn wrap(owner: M) -> Result<Self, InternalError> {
        Self::from_arc(Arc::new(owner))
    }

    /// Wrap an owner that is already shared.
    pub fn from_arc(owner: Arc<M>) -> Result<Self, InternalError> {
        Schema::<M>::of()?;
        if owner.registry().claim_setup() {
            owner.setup();
        }
        Ok(Self { inner: owner })
    }

    pub(crate) fn from_arc_unchecked(owner: Arc<M>) -> Self {
        Self { inner: owner }
    }

    /// Cached action of definition `D`.
    pub fn action<D: ActionDef<M>>(&self) -> Result<Arc<Action<M, D>>, InternalError> {
        self.inner.action::<D>()
    }

    /// Action declared under `name`.
    ///
    /// Fails with `NotAnAction` for a declared plain method and with
    /// `MethodNotFound` for anything else.
    pub fn action_by_name(&self, name: &str) -> Result<DynAction, InternalError> {
        let schema = Schema::<M>::of()?;
        let erased = schema
            .resolve(name)?
            .create(self.inner.registry(), &self.inner)?;
        Ok(DynAction::new(erased))
    }

    /// Shorthand for `self.action::<D>()?.exec(args)`.
    pub fn call<D: ActionDef<M>>(&self, args: D::Args) -> Result<ActionPromise, Error> {
        self.inner.call::<D>(args)
    }

    pub fn schema(&self) -> Result<Arc<Schema<M>>, InternalError> {
        Schema::<M>::of()
    }

    /// Captured errors of every action currently in `error`.
    pub fn errors(&self) -> Option<ModelError> {
        let errors = self.inner.registry().errors();
        if errors.is_empty() {
            None
        } else {
            Some(ModelError::new(errors))
        }
    }

    /// Serializable state of every action created so far.
    pub fn snapshot(&self) -> ModelSnapshot {
        let registry = self.inner.registry();
        ModelSnapshot {
            version: SNAPSHOT_VERSION,
            model_id: registry.model_id(),
            timestamp: Utc::now(),
            actions: registry
                .created()
                .iter()
                .map(|action| action.core().snapshot())
                .collect(),
        }
    }

    /// Dispose every watcher and computed value the model registered.
    pub fn destroy(&self) {
        self.inner.registry().destroy();
    }
}

impl<M> Model<M> {
    /// Whether the wrapped owner is of type `T`.
    pub fn is_model_of<T: 'static>(&self) -> bool
    where
        M: 'static,
    {
        TypeId::of::<T>() == TypeId::of::<M>()
    }

    /// Whether both facades wrap the same owner.
    pub fn ptr_eq(&self, other: &Model<M>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The unwrapped owner.
    pub fn owner(&self) -> &Arc<M> {
        &self.inner
    }

    pub fn downgrade(&self) -> Weak<M> {
        Arc::downgrade(&self.inner)
    }

    pub fn into_inner(self) -> Arc<M> {
        self.inner
    }
}

impl<M> Deref for Model<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.inner
    }
}

impl<M: ProtoModel> fmt::Debug for Model<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &std::any::type_name::<M>())
            .field("registry", self.inner.registry())
            .finish()
    }
}
