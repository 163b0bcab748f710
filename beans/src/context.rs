//! The `ApplicationContext`: the registry of bean definitions and the engine
//! that resolves, instantiates and tears them down.

use crate::definition::{Bean, BeanDefinition, Instance};
use crate::error::{Error, Result};
use crate::key::{Qualifier, TypeKey};
use crate::profile::{Environment, Profiles};
use crate::sync::synchronized;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

pub(crate) struct Registry {
  environment: RwLock<Arc<dyn Environment>>,
  // Keyed by each definition's own produced type.
  beans: DashMap<TypeKey, Vec<Arc<dyn Bean>>>,
  named: DashMap<String, Arc<dyn Bean>>,
  // Singletons with a pre-destroy callback, in order of first instantiation.
  pre_destroy_eligible: Mutex<Vec<Arc<dyn Bean>>>,
  // Bumped by every close, under the `pre_destroy_eligible` lock.
  generation: AtomicU64,
}

/// The bean registry.
///
/// Register every definition before the context starts serving lookups;
/// registration is not ordered against concurrent resolution. Resolution
/// itself is thread-safe: constructing one singleton only blocks callers of
/// that same singleton.
///
/// Cloning is cheap and yields a handle to the same registry. Independent
/// registries are created with [`ApplicationContext::new`].
#[derive(Clone)]
pub struct ApplicationContext {
  inner: Arc<Registry>,
}

impl Default for ApplicationContext {
  fn default() -> Self {
    Self::new()
  }
}

impl ApplicationContext {
  /// Creates an empty context with no active profiles.
  pub fn new() -> Self {
    Self::with_environment(Profiles::default())
  }

  /// Creates an empty context whose active profiles are read from
  /// `FIBRE_PROFILES_ACTIVE`.
  pub fn from_env() -> Self {
    Self::with_environment(Profiles::from_env())
  }

  pub fn with_environment(environment: impl Environment + 'static) -> Self {
    Self {
      inner: Arc::new(Registry {
        environment: RwLock::new(Arc::new(environment)),
        beans: DashMap::new(),
        named: DashMap::new(),
        pre_destroy_eligible: Mutex::new(Vec::new()),
        generation: AtomicU64::new(0),
      }),
    }
  }

  /// Replaces the environment consulted by subsequent registrations.
  pub fn set_environment(&self, environment: impl Environment + 'static) {
    *self.inner.environment.write() = Arc::new(environment);
  }

  pub fn environment(&self) -> Arc<dyn Environment> {
    self.inner.environment.read().clone()
  }

  pub(crate) fn downgrade(&self) -> Weak<Registry> {
    Arc::downgrade(&self.inner)
  }

  pub(crate) fn from_registry(inner: Arc<Registry>) -> Self {
    Self { inner }
  }

  // --- Registration ---

  /// Adds a definition to the registry.
  ///
  /// Definitions whose profile expression does not match the active profiles
  /// are skipped without error.
  pub fn register<T: Any + Send + Sync>(&self, definition: BeanDefinition<T>) -> Result<()> {
    self.register_shared(Arc::new(definition))
  }

  /// Like [`register`](Self::register), for a definition the caller keeps a
  /// handle to. Registering the same definition twice adds it twice.
  ///
  /// A definition belongs to one context at a time: registering it in a
  /// second live context fails until the first one is closed or dropped.
  pub fn register_shared<T: Any + Send + Sync>(
    &self,
    definition: Arc<BeanDefinition<T>>,
  ) -> Result<()> {
    definition.validate()?;

    let environment = self.environment();
    if !environment.matches_profiles(definition.profiles()) {
      debug!(
        bean = %definition,
        profiles = ?definition.profiles(),
        active = ?environment.active_profiles(),
        "profile does not match, skipping bean"
      );
      return Ok(());
    }

    info!(bean = %definition, "registering bean");
    let names = definition.registered_names().to_vec();
    let bean: Arc<dyn Bean> = definition;
    let claimed = bean.claim(&self.downgrade())?;
    if let Err(err) = self.bind_names(&names, &bean) {
      if claimed {
        bean.discard();
      }
      return Err(err);
    }
    self.inner.beans.entry(bean.type_key()).or_default().push(bean);
    Ok(())
  }

  fn bind_names(&self, names: &[String], bean: &Arc<dyn Bean>) -> Result<()> {
    for (bound, name) in names.iter().enumerate() {
      let taken = match self.inner.named.entry(name.clone()) {
        Entry::Occupied(_) => true,
        Entry::Vacant(slot) => {
          slot.insert(Arc::clone(bean));
          false
        }
      };
      if taken {
        // Leave the registry as it was before this definition.
        for earlier in &names[..bound] {
          self.inner.named.remove(earlier);
        }
        return Err(Error::DuplicateName(name.clone()));
      }
    }
    Ok(())
  }

  // --- Resolution ---

  /// Resolves a qualifier to a type-erased instance holding `Arc<R>`, where
  /// `R` is the qualifier's type.
  pub fn bean(&self, qualifier: &Qualifier) -> Result<Box<dyn Any + Send + Sync>> {
    let generation = self.generation();
    let bean = self.select(qualifier)?;
    self.obtain(&bean, qualifier.key(), generation)
  }

  /// Resolves a bean by type and optional name.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self, name: Option<&str>) -> Result<Arc<T>> {
    let qualifier = match name {
      Some(n) => Qualifier::named::<T>(n),
      None => Qualifier::of::<T>(),
    };
    self.resolve(&qualifier)
  }

  pub(crate) fn resolve<T: ?Sized + Any + Send + Sync>(
    &self,
    qualifier: &Qualifier,
  ) -> Result<Arc<T>> {
    let generation = self.generation();
    let bean = self.select(qualifier)?;
    let instance = self.obtain(&bean, qualifier.key(), generation)?;
    instance
      .downcast::<Arc<T>>()
      .map(|arc_in_a_box| *arc_in_a_box)
      .map_err(|_| Error::TypeMismatch {
        requested: std::any::type_name::<T>(),
        actual: bean.type_key().name(),
      })
  }

  fn select(&self, qualifier: &Qualifier) -> Result<Arc<dyn Bean>> {
    let requested = qualifier.key();

    if let Some(name) = qualifier.name() {
      let bean = self
        .inner
        .named
        .get(name)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| Error::NoSuchName(name.to_owned()))?;
      if !bean.is_eligible(requested) {
        return Err(Error::TypeMismatch {
          requested: requested.name(),
          actual: bean.type_key().name(),
        });
      }
      return Ok(bean);
    }

    let mut candidates = Vec::new();
    let mut primary_candidates = Vec::new();
    for entry in self.inner.beans.iter() {
      for bean in entry.value().iter().filter(|bean| bean.is_eligible(requested)) {
        if bean.is_primary() {
          primary_candidates.push(Arc::clone(bean));
        }
        candidates.push(Arc::clone(bean));
      }
    }

    if primary_candidates.len() > 1 {
      return Err(Error::MultiplePrimary {
        requested: requested.name(),
        candidates: describe(&primary_candidates),
      });
    }
    if let Some(primary) = primary_candidates.pop() {
      return Ok(primary);
    }

    match candidates.len() {
      0 => Err(Error::NoSuchType(requested.name())),
      1 => Ok(candidates.remove(0)),
      _ => Err(Error::Ambiguous {
        requested: requested.name(),
        candidates: describe(&candidates),
      }),
    }
  }

  fn generation(&self) -> u64 {
    self.inner.generation.load(Ordering::Acquire)
  }

  // A construction that outlives a close must not enlist in the next
  // generation's teardown.
  fn obtain(
    &self,
    bean: &Arc<dyn Bean>,
    requested: &TypeKey,
    generation: u64,
  ) -> Result<Instance> {
    bean.provide(requested, &|| {
      if bean.has_pre_destroy() {
        synchronized(&self.inner.pre_destroy_eligible, |eligible| {
          if self.generation() == generation {
            eligible.push(Arc::clone(bean));
          }
        });
      }
    })
  }

  // --- Teardown ---

  /// Runs pre-destroy callbacks in reverse order of first instantiation,
  /// then empties the registry. The context can be reused afterwards.
  ///
  /// A failing callback is logged and does not stop the others. A singleton
  /// whose first construction is still running when close starts is not
  /// destroyed; close waits for that construction before discarding it.
  pub fn close(&self) {
    info!("closing application context");

    let eligible = synchronized(&self.inner.pre_destroy_eligible, |eligible| {
      self.inner.generation.fetch_add(1, Ordering::AcqRel);
      mem::take(eligible)
    });
    for bean in eligible.iter().rev() {
      debug!(bean = %bean, "destroying bean");
      bean.destroy();
    }

    // Every registered definition is owned by this context.
    for entry in self.inner.beans.iter() {
      for bean in entry.value().iter() {
        bean.discard();
      }
    }
    self.inner.beans.clear();
    self.inner.named.clear();

    info!("application context closed");
  }

  /// Number of registered definitions (a definition registered twice counts
  /// twice).
  pub fn len(&self) -> usize {
    self.inner.beans.iter().map(|entry| entry.value().len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Whether a bean is registered under `name`.
  pub fn contains_name(&self, name: &str) -> bool {
    self.inner.named.contains_key(name)
  }
}

impl fmt::Debug for ApplicationContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ApplicationContext")
      .field("beans", &self.len())
      .field("names", &self.inner.named.len())
      .finish()
  }
}

fn describe(beans: &[Arc<dyn Bean>]) -> Vec<String> {
  beans.iter().map(|bean| bean.to_string()).collect()
}
