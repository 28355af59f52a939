//! Target resolution: identifier → live component exposing startup methods.
//!
//! The scheduler never constructs targets itself. It asks a [`Resolver`]
//! for the instance behind a [`TargetId`] and then looks the registered
//! method up by name through [`Component::startup_method`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use ignite_types::{MethodName, TargetId};

use crate::completion::Completion;
use crate::error::ResolveError;

/// A startup routine. It receives the item's [`Completion`] and signals
/// logical completion by calling [`Completion::complete`], synchronously or
/// from any later task. Its own return is not observed.
pub type StartupMethod = Arc<dyn Fn(Completion) + Send + Sync>;

/// Something a target identifier resolves to.
pub trait Component: Send + Sync {
    /// Look up a startup method by name.
    fn startup_method(&self, name: &MethodName) -> Option<StartupMethod>;
}

/// Maps target identifiers to component instances.
pub trait Resolver: Send + Sync {
    fn resolve(&self, target: &TargetId) -> Result<Arc<dyn Component>, ResolveError>;
}

// ── MethodTable ──────────────────────────────────────────────

/// A component assembled from named closures.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<MethodName, StartupMethod>,
}

impl MethodTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method that receives the completion handle directly.
    #[must_use]
    pub fn with_method<F>(mut self, name: MethodName, method: F) -> Self
    where
        F: Fn(Completion) + Send + Sync + 'static,
    {
        self.methods.insert(name, Arc::new(method));
        self
    }

    /// Add a method whose body is a future, spawned on the current runtime.
    ///
    /// The scheduler does not await the future; the item advances only when
    /// the future (or anything it hands the handle to) calls `complete`.
    #[must_use]
    pub fn with_async_method<F, Fut>(mut self, name: MethodName, method: F) -> Self
    where
        F: Fn(Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let spawn = move |done: Completion| {
            tokio::spawn(method(done));
        };
        self.methods.insert(name, Arc::new(spawn));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &MethodName) -> bool {
        self.methods.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Component for MethodTable {
    fn startup_method(&self, name: &MethodName) -> Option<StartupMethod> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(MethodName::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

// ── Container ────────────────────────────────────────────────

type Factory = Box<dyn Fn() -> Result<Arc<dyn Component>, String> + Send + Sync>;

enum Provider {
    Instance(Arc<dyn Component>),
    /// Built on first resolution, then cached.
    Factory(Factory),
}

/// Explicit target registry: already-built instances plus lazy factories.
#[derive(Default)]
pub struct Container {
    providers: HashMap<TargetId, Provider>,
    built: Mutex<HashMap<TargetId, Arc<dyn Component>>>,
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready instance, replacing any previous provider for `target`.
    pub fn insert_instance(&mut self, target: TargetId, instance: Arc<dyn Component>) {
        self.providers.insert(target, Provider::Instance(instance));
    }

    /// Register a factory run at most once, on first successful resolution.
    pub fn insert_factory<F>(&mut self, target: TargetId, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Component>, String> + Send + Sync + 'static,
    {
        self.providers
            .insert(target, Provider::Factory(Box::new(factory)));
    }

    #[must_use]
    pub fn with_instance(mut self, target: TargetId, instance: Arc<dyn Component>) -> Self {
        self.insert_instance(target, instance);
        self
    }

    #[must_use]
    pub fn with_factory<F>(mut self, target: TargetId, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Component>, String> + Send + Sync + 'static,
    {
        self.insert_factory(target, factory);
        self
    }

    #[must_use]
    pub fn contains(&self, target: &TargetId) -> bool {
        self.providers.contains_key(target)
    }
}

impl Resolver for Container {
    fn resolve(&self, target: &TargetId) -> Result<Arc<dyn Component>, ResolveError> {
        let factory = match self.providers.get(target) {
            Some(Provider::Instance(instance)) => return Ok(Arc::clone(instance)),
            Some(Provider::Factory(factory)) => factory,
            None => return Err(ResolveError::UnknownTarget(target.clone())),
        };

        let mut built = self.built.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(instance) = built.get(target) {
            return Ok(Arc::clone(instance));
        }
        let instance = factory().map_err(|message| ResolveError::FactoryFailed {
            target: target.clone(),
            message,
        })?;
        tracing::debug!(target = %target, "Built target from factory");
        built.insert(target.clone(), Arc::clone(&instance));
        Ok(instance)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<&str> = self.providers.keys().map(TargetId::as_str).collect();
        targets.sort_unstable();
        f.debug_struct("Container")
            .field("targets", &targets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn target(name: &str) -> TargetId {
        TargetId::new(name).unwrap()
    }

    fn method(name: &str) -> MethodName {
        MethodName::new(name).unwrap()
    }

    #[test]
    fn test_method_table_lookup() {
        let table = MethodTable::new().with_method(method("init"), |_done| {});
        assert!(table.contains(&method("init")));
        assert!(table.startup_method(&method("init")).is_some());
        assert!(table.startup_method(&method("start")).is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(format!("{table:?}"), "MethodTable { methods: [\"init\"] }");
    }

    #[test]
    fn test_instance_resolves_to_same_arc() {
        let instance: Arc<dyn Component> = Arc::new(MethodTable::new());
        let container = Container::new().with_instance(target("db"), Arc::clone(&instance));

        let resolved = container.resolve(&target("db")).unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));
    }

    #[test]
    fn test_factory_runs_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let container = Container::new().with_factory(target("cache"), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MethodTable::new()) as Arc<dyn Component>)
        });

        let first = container.resolve(&target("cache")).unwrap();
        let second = container.resolve(&target("cache")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_factory_is_retried_on_next_resolve() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let container = Container::new().with_factory(target("flaky"), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("not yet".to_string())
            } else {
                Ok(Arc::new(MethodTable::new()) as Arc<dyn Component>)
            }
        });

        let Err(err) = container.resolve(&target("flaky")) else {
            panic!("first factory attempt should fail");
        };
        assert_eq!(
            err,
            ResolveError::FactoryFailed {
                target: target("flaky"),
                message: "not yet".to_string(),
            }
        );
        assert!(container.resolve(&target("flaky")).is_ok());
    }

    #[test]
    fn test_unknown_target() {
        let container = Container::new();
        assert!(!container.contains(&target("ghost")));
        let Err(err) = container.resolve(&target("ghost")) else {
            panic!("unknown target should not resolve");
        };
        assert_eq!(err, ResolveError::UnknownTarget(target("ghost")));
    }
}
