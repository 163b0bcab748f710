//! Lazily resolved injection points.

use crate::context::{ApplicationContext, Registry};
use crate::error::{Error, Result};
use crate::global::application_context;
use crate::key::Qualifier;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::error;

#[derive(Clone)]
enum Source {
  Global,
  Context(Weak<Registry>),
}

/// A dependency declared as a field, resolved on first use.
///
/// Components store `Inject<T>` instead of `Arc<T>` so that the order in
/// which mutually dependent beans are declared does not matter: the lookup
/// happens the first time [`get`](Inject::get) is called, when the whole
/// graph is registered. The result is memoized; concurrent first callers
/// block until the single lookup finishes and then share its result.
///
/// ```
/// use fibre_beans::{ApplicationContext, BeanDefinition, Inject};
///
/// struct Repository;
/// struct Service {
///   repository: Inject<Repository>,
/// }
///
/// let context = ApplicationContext::new();
/// let repository = Inject::<Repository>::from_context(&context);
/// BeanDefinition::<Service>::new()
///   .factory(move || Service {
///     repository: repository.clone(),
///   })
///   .register_in(&context)
///   .unwrap();
/// BeanDefinition::<Repository>::new()
///   .factory(|| Repository)
///   .register_in(&context)
///   .unwrap();
///
/// let service = context.get::<Service>(None).unwrap();
/// let _repository = service.repository.get();
/// ```
pub struct Inject<T: ?Sized + Any + Send + Sync> {
  qualifier: Qualifier,
  source: Source,
  resolved: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> Inject<T> {
  /// Injects the single eligible (or primary) bean of type `T` from the
  /// process-wide context.
  pub fn new() -> Self {
    Self::with_source(Qualifier::of::<T>(), Source::Global)
  }

  /// Injects the bean called `name` from the process-wide context.
  pub fn named(name: &str) -> Self {
    Self::with_source(Qualifier::named::<T>(name), Source::Global)
  }

  /// Like [`Inject::new`], but resolves against `context`.
  ///
  /// Only a weak handle is kept, so a bean factory can capture one (and
  /// clone it per instance) without keeping its own context alive.
  pub fn from_context(context: &ApplicationContext) -> Self {
    Self::with_source(Qualifier::of::<T>(), Source::Context(context.downgrade()))
  }

  pub fn named_from(context: &ApplicationContext, name: &str) -> Self {
    Self::with_source(
      Qualifier::named::<T>(name),
      Source::Context(context.downgrade()),
    )
  }

  fn with_source(qualifier: Qualifier, source: Source) -> Self {
    Self {
      qualifier,
      source,
      resolved: OnceCell::new(),
    }
  }

  pub fn qualifier(&self) -> &Qualifier {
    &self.qualifier
  }

  /// Whether the first resolution already happened.
  pub fn is_resolved(&self) -> bool {
    self.resolved.get().is_some()
  }

  /// Resolves on first call and returns the memoized bean afterwards.
  ///
  /// A failed resolution is not memoized.
  pub fn try_get(&self) -> Result<Arc<T>> {
    self
      .resolved
      .get_or_try_init(|| self.context()?.resolve::<T>(&self.qualifier))
      .cloned()
  }

  /// Resolves on first call and returns the memoized bean afterwards.
  ///
  /// # Panics
  ///
  /// Panics if the dependency cannot be resolved. A missing or ambiguous
  /// bean is a wiring mistake, not a condition to recover from.
  pub fn get(&self) -> Arc<T> {
    self.try_get().unwrap_or_else(|err| {
      error!(qualifier = ?self.qualifier, error = %err, "failed to inject bean");
      panic!("Failed to inject {:?}: {}", self.qualifier, err)
    })
  }

  /// Turns the injection point into a zero-argument accessor.
  pub fn resolve(self) -> impl Fn() -> Arc<T> + Send + Sync {
    move || self.get()
  }

  fn context(&self) -> Result<ApplicationContext> {
    match &self.source {
      Source::Global => Ok(application_context().clone()),
      Source::Context(registry) => registry
        .upgrade()
        .map(ApplicationContext::from_registry)
        .ok_or(Error::ContextDropped),
    }
  }
}

/// Clones share the binding and any already resolved bean. A clone taken
/// before the first resolution resolves on its own.
impl<T: ?Sized + Any + Send + Sync> Clone for Inject<T> {
  fn clone(&self) -> Self {
    Self {
      qualifier: self.qualifier.clone(),
      source: self.source.clone(),
      resolved: self.resolved.clone(),
    }
  }
}

impl<T: ?Sized + Any + Send + Sync> Default for Inject<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized + Any + Send + Sync> fmt::Debug for Inject<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Inject")
      .field("qualifier", &self.qualifier)
      .field("resolved", &self.is_resolved())
      .finish()
  }
}
