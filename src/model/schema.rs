//! Registration of which members of a model are actions.

use super::proto::ProtoModel;
use super::registry::Registry;
use crate::action::{ActionDef, ErasedAction};
use crate::error::InternalError;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

type Create<M> = fn(&Registry<M>, &Arc<M>) -> Result<Arc<dyn ErasedAction>, InternalError>;

pub(crate) struct ActionEntry<M> {
    name: &'static str,
    def: TypeId,
    create: Create<M>,
}

impl<M> ActionEntry<M> {
    pub(crate) fn create(
        &self,
        registry: &Registry<M>,
        owner: &Arc<M>,
    ) -> Result<Arc<dyn ErasedAction>, InternalError> {
        (self.create)(registry, owner)
    }
}

/// The members a model type declared, built once per type from
/// [`ProtoModel::declare`].
pub struct Schema<M> {
    actions: Vec<ActionEntry<M>>,
    methods: Vec<&'static str>,
}

type SchemaCache = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn schemas() -> &'static SchemaCache {
    static SCHEMAS: OnceLock<SchemaCache> = OnceLock::new();
    SCHEMAS.get_or_init(Default::default)
}

impl<M: ProtoModel> Schema<M> {
    /// Schema of `M`, declared on first use and cached for the process.
    /// A misconfigured declaration is reported on every call.
    pub fn of() -> Result<Arc<Schema<M>>, InternalError> {
        let key = TypeId::of::<M>();
        let cached = schemas().lock().get(&key).cloned();
        if let Some(schema) = cached.and_then(|any| any.downcast::<Schema<M>>().ok()) {
            return Ok(schema);
        }

        let schema = Arc::new(M::declare(SchemaBuilder::new()).build()?);
        debug!(
            model = std::any::type_name::<M>(),
            actions = schema.actions.len(),
            methods = schema.methods.len(),
            "model schema declared"
        );

        // Another thread may have declared the same type meanwhile.
        let stored = Arc::clone(
            schemas()
                .lock()
                .entry(key)
                .or_insert_with(|| Arc::clone(&schema) as Arc<dyn Any + Send + Sync>),
        );
        Ok(stored.downcast::<Schema<M>>().unwrap_or(schema))
    }

    /// Fail unless `D` is declared as an action of `M`.
    pub(crate) fn check<D: ActionDef<M>>(&self) -> Result<(), InternalError> {
        if self.actions.iter().any(|entry| entry.def == TypeId::of::<D>()) {
            return Ok(());
        }
        if self.declares(D::NAME) {
            return Err(InternalError::NotAnAction {
                name: D::NAME.to_string(),
            });
        }
        Err(InternalError::MethodNotFound {
            name: D::NAME.to_string(),
        })
    }

    /// Action registered under `name`; the latest registration wins when a
    /// definition overrides another one.
    pub(crate) fn resolve(&self, name: &str) -> Result<&ActionEntry<M>, InternalError> {
        if let Some(entry) = self.actions.iter().rev().find(|entry| entry.name == name) {
            return Ok(entry);
        }
        if self.methods.contains(&name) {
            return Err(InternalError::NotAnAction {
                name: name.to_string(),
            });
        }
        Err(InternalError::MethodNotFound {
            name: name.to_string(),
        })
    }
}

impl<M> Schema<M> {
    /// Whether `name` is declared, as an action or a plain method.
    pub fn declares(&self, name: &str) -> bool {
        self.is_action(name) || self.methods.contains(&name)
    }

    pub fn is_action(&self, name: &str) -> bool {
        self.actions.iter().any(|entry| entry.name == name)
    }

    /// Action names in declaration order, overrides listed once.
    pub fn action_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for entry in &self.actions {
            if !names.contains(&entry.name) {
                names.push(entry.name);
            }
        }
        names
    }

    pub fn method_names(&self) -> &[&'static str] {
        &self.methods
    }
}

/// Builder for a model's schema with a fluent API.
///
/// Mistakes are collected while declaring and the first one is reported
/// by [`SchemaBuilder::build`].
pub struct SchemaBuilder<M> {
    actions: Vec<ActionEntry<M>>,
    methods: Vec<&'static str>,
    errors: Vec<InternalError>,
}

impl<M: ProtoModel> SchemaBuilder<M> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            methods: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Declare definition `D` as an action.
    ///
    /// A second definition may reuse the name of an earlier one; lookups by
    /// name then resolve to the later definition while each definition
    /// keeps its own action.
    pub fn action<D: ActionDef<M>>(mut self) -> Self {
        let def = TypeId::of::<D>();
        if D::NAME.is_empty() {
            self.errors.push(InternalError::EmptyName);
        } else if self.methods.contains(&D::NAME) || self.actions.iter().any(|e| e.def == def) {
            self.errors.push(InternalError::DuplicateMember {
                name: D::NAME.to_string(),
            });
        } else {
            self.actions.push(ActionEntry {
                name: D::NAME,
                def,
                create: Registry::<M>::create_erased::<D>,
            });
        }
        self
    }

    /// Declare a plain method, reachable through the facade but never
    /// turned into an action.
    pub fn method(mut self, name: &'static str) -> Self {
        if name.is_empty() {
            self.errors.push(InternalError::EmptyName);
        } else if self.methods.contains(&name) || self.actions.iter().any(|e| e.name == name) {
            self.errors.push(InternalError::DuplicateMember {
                name: name.to_string(),
            });
        } else {
            self.methods.push(name);
        }
        self
    }

    /// Build the schema.
    /// Returns the first mistake made while declaring.
    pub fn build(self) -> Result<Schema<M>, InternalError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        Ok(Schema {
            actions: self.actions,
            methods: self.methods,
        })
    }
}

impl<M: ProtoModel> Default for SchemaBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
