//! Bean definitions: the recipe for one managed component.

use crate::context::{ApplicationContext, Registry};
use crate::error::{DestroyError, Error, Result};
use crate::key::TypeKey;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// A resolved bean, type-erased. It always holds an `Arc<R>` where `R` is
/// the type that was requested.
pub(crate) type Instance = Box<dyn Any + Send + Sync>;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type PostConstruct<T> = Box<dyn Fn(&T) + Send + Sync>;
type PreDestroy<T> = Box<dyn Fn(&T) -> Result<(), DestroyError> + Send + Sync>;
type Cast<T> = Box<dyn Fn(Arc<T>) -> Instance + Send + Sync>;

/// How many instances a definition produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
  /// One lazily created instance, shared by every resolution.
  #[default]
  Singleton,
  /// A fresh instance for every resolution. Never memoized or destroyed.
  Prototype,
}

impl Scope {
  pub fn as_str(&self) -> &'static str {
    match self {
      Scope::Singleton => "singleton",
      Scope::Prototype => "prototype",
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Scope {
  type Err = Error;

  fn from_str(keyword: &str) -> Result<Self> {
    match keyword {
      "singleton" => Ok(Scope::Singleton),
      "prototype" => Ok(Scope::Prototype),
      other => Err(Error::UnsupportedScope(other.to_owned())),
    }
  }
}

/// Describes how to produce a bean of type `T`.
///
/// Definitions are built with chained calls and then registered into an
/// [`ApplicationContext`]:
///
/// ```
/// use fibre_beans::{ApplicationContext, BeanDefinition, Scope};
///
/// let context = ApplicationContext::new();
/// BeanDefinition::<String>::new()
///   .name("greeting")
///   .scope(Scope::Prototype)
///   .factory(|| String::from("hello"))
///   .register_in(&context)
///   .unwrap();
///
/// let greeting = context.get::<String>(Some("greeting")).unwrap();
/// assert_eq!(*greeting, "hello");
/// ```
pub struct BeanDefinition<T> {
  key: TypeKey,
  names: Vec<String>,
  scope: Scope,
  primary: bool,
  profiles: Vec<String>,
  factory: Option<Factory<T>>,
  post_construct: Option<PostConstruct<T>>,
  pre_destroy: Option<PreDestroy<T>>,
  capabilities: HashMap<TypeKey, Cast<T>>,
  // The cell is the at-most-once gate; the lock only guards replacing it on
  // close, so a close waits for a construction in progress.
  instance: RwLock<OnceCell<Arc<T>>>,
  // The context whose close may reset `instance`.
  owner: Mutex<Weak<Registry>>,
}

impl<T: Any + Send + Sync> Default for BeanDefinition<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Any + Send + Sync> BeanDefinition<T> {
  pub fn new() -> Self {
    Self {
      key: TypeKey::of::<T>(),
      names: Vec::new(),
      scope: Scope::Singleton,
      primary: false,
      profiles: Vec::new(),
      factory: None,
      post_construct: None,
      pre_destroy: None,
      capabilities: HashMap::new(),
      instance: RwLock::new(OnceCell::new()),
      owner: Mutex::new(Weak::new()),
    }
  }

  // --- Declaration ---

  /// Adds a name the bean can be looked up by. Names are unique per context.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.names.push(name.into());
    self
  }

  pub fn names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.names.extend(names.into_iter().map(Into::into));
    self
  }

  pub fn scope(mut self, scope: Scope) -> Self {
    self.scope = scope;
    self
  }

  /// Lets this bean win unnamed resolution over other eligible beans.
  pub fn primary(mut self) -> Self {
    self.primary = true;
    self
  }

  /// Binds the bean to a profile expression (`"test"`, `"!test"`). With
  /// several expressions, any matching one is enough.
  pub fn profile(mut self, expression: impl Into<String>) -> Self {
    self.profiles.push(expression.into());
    self
  }

  pub fn factory(mut self, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
    self.factory = Some(Box::new(factory));
    self
  }

  /// Runs right after the factory. Injected beans are safe to use here.
  pub fn post_construct(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
    self.post_construct = Some(Box::new(callback));
    self
  }

  /// Cleans up before shutdown. Not available on prototype beans.
  pub fn pre_destroy(
    mut self,
    callback: impl Fn(&T) -> Result<(), DestroyError> + Send + Sync + 'static,
  ) -> Result<Self> {
    if self.scope == Scope::Prototype {
      return Err(Error::PrototypePreDestroy {
        bean: self.to_string(),
      });
    }
    self.pre_destroy = Some(Box::new(callback));
    Ok(self)
  }

  /// Makes the bean eligible for requests of `I`, typically a trait object.
  ///
  /// ```
  /// use fibre_beans::{ApplicationContext, BeanDefinition};
  /// use std::sync::Arc;
  ///
  /// trait Greeter: Send + Sync {
  ///   fn greet(&self) -> String;
  /// }
  /// struct English;
  /// impl Greeter for English {
  ///   fn greet(&self) -> String {
  ///     "Hello!".to_string()
  ///   }
  /// }
  ///
  /// let context = ApplicationContext::new();
  /// BeanDefinition::<English>::new()
  ///   .factory(|| English)
  ///   .provides::<dyn Greeter>(|english| english)
  ///   .register_in(&context)
  ///   .unwrap();
  ///
  /// let greeter: Arc<dyn Greeter> = context.get::<dyn Greeter>(None).unwrap();
  /// assert_eq!(greeter.greet(), "Hello!");
  /// ```
  pub fn provides<I: ?Sized + Any + Send + Sync>(
    mut self,
    cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
  ) -> Self {
    self.capabilities.insert(
      TypeKey::of::<I>(),
      Box::new(move |instance| Box::new(cast(instance)) as Instance),
    );
    self
  }

  /// Registers into the process-wide context.
  pub fn register(self) -> Result<()> {
    self.register_in(crate::global::application_context())
  }

  pub fn register_in(self, context: &ApplicationContext) -> Result<()> {
    context.register(self)
  }

  // --- Inspection ---

  pub fn type_key(&self) -> TypeKey {
    self.key
  }

  pub fn registered_names(&self) -> &[String] {
    &self.names
  }

  pub fn is_primary(&self) -> bool {
    self.primary
  }

  pub fn profiles(&self) -> &[String] {
    &self.profiles
  }

  /// Whether this definition can satisfy a request for `requested`.
  pub fn is_eligible(&self, requested: &TypeKey) -> bool {
    *requested == self.key || self.capabilities.contains_key(requested)
  }

  pub(crate) fn validate(&self) -> Result<()> {
    if self.factory.is_none() {
      return Err(Error::MissingFactory {
        bean: self.to_string(),
      });
    }
    if self.scope == Scope::Prototype && self.pre_destroy.is_some() {
      return Err(Error::PrototypePreDestroy {
        bean: self.to_string(),
      });
    }
    Ok(())
  }

  // --- Instantiation ---

  fn instantiate(&self) -> Result<Arc<T>> {
    let factory = self.factory.as_ref().ok_or_else(|| Error::MissingFactory {
      bean: self.to_string(),
    })?;
    debug!(bean = %self, "instantiating bean");
    let instance = Arc::new(factory());
    if let Some(post_construct) = &self.post_construct {
      post_construct(&*instance);
    }
    Ok(instance)
  }

  fn singleton(&self, on_instantiated: &dyn Fn()) -> Result<Arc<T>> {
    self
      .instance
      .read()
      .get_or_try_init(|| {
        let instance = self.instantiate()?;
        on_instantiated();
        Ok::<_, Error>(instance)
      })
      .cloned()
  }

  fn cast(&self, instance: Arc<T>, requested: &TypeKey) -> Result<Instance> {
    if *requested == self.key {
      return Ok(Box::new(instance) as Instance);
    }
    match self.capabilities.get(requested) {
      Some(cast) => Ok(cast(instance)),
      None => Err(self.mismatch(requested)),
    }
  }

  fn mismatch(&self, requested: &TypeKey) -> Error {
    Error::TypeMismatch {
      requested: requested.name(),
      actual: self.key.name(),
    }
  }
}

impl<T> fmt::Display for BeanDefinition<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[{}", self.key, self.scope)?;
    if self.primary {
      f.write_str(" primary")?;
    }
    if !self.names.is_empty() {
      write!(f, " {}", self.names.join(", "))?;
    }
    f.write_str("]")
  }
}

impl<T> fmt::Debug for BeanDefinition<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BeanDefinition")
      .field("type", &self.key)
      .field("names", &self.names)
      .field("scope", &self.scope)
      .field("primary", &self.primary)
      .field("profiles", &self.profiles)
      .finish_non_exhaustive()
  }
}

/// The type-erased face of a [`BeanDefinition`] that the registry stores.
pub(crate) trait Bean: fmt::Display + Send + Sync {
  fn type_key(&self) -> TypeKey;

  fn is_primary(&self) -> bool;

  fn is_eligible(&self, requested: &TypeKey) -> bool;

  fn has_pre_destroy(&self) -> bool;

  /// Binds the definition to `context`. Fails if another live context
  /// already owns it. Returns `true` if the binding is new.
  fn claim(&self, context: &Weak<Registry>) -> Result<bool>;

  /// Produces an instance according to the bean's scope and casts it to
  /// `requested`. `on_instantiated` runs once, right after a singleton's
  /// first construction, before any waiting resolver is released.
  fn provide(&self, requested: &TypeKey, on_instantiated: &dyn Fn()) -> Result<Instance>;

  /// Runs the pre-destroy callback on the memoized instance, if both exist.
  /// Failures are logged, never propagated.
  fn destroy(&self);

  /// Drops the memoized instance and the context binding.
  fn discard(&self);
}

impl<T: Any + Send + Sync> Bean for BeanDefinition<T> {
  fn type_key(&self) -> TypeKey {
    self.key
  }

  fn is_primary(&self) -> bool {
    self.primary
  }

  fn is_eligible(&self, requested: &TypeKey) -> bool {
    BeanDefinition::is_eligible(self, requested)
  }

  fn has_pre_destroy(&self) -> bool {
    self.pre_destroy.is_some()
  }

  fn claim(&self, context: &Weak<Registry>) -> Result<bool> {
    let mut owner = self.owner.lock();
    if Weak::ptr_eq(&*owner, context) {
      return Ok(false);
    }
    if owner.strong_count() > 0 {
      return Err(Error::ForeignDefinition {
        bean: self.to_string(),
      });
    }
    // Whatever an abandoned context left memoized was never torn down here.
    self.instance.write().take();
    *owner = context.clone();
    Ok(true)
  }

  fn provide(&self, requested: &TypeKey, on_instantiated: &dyn Fn()) -> Result<Instance> {
    if !BeanDefinition::is_eligible(self, requested) {
      return Err(self.mismatch(requested));
    }
    let instance = match self.scope {
      Scope::Singleton => self.singleton(on_instantiated)?,
      Scope::Prototype => self.instantiate()?,
    };
    self.cast(instance, requested)
  }

  fn destroy(&self) {
    let Some(callback) = &self.pre_destroy else {
      return;
    };
    let Some(instance) = self.instance.read().get().cloned() else {
      return;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| callback(&*instance))) {
      Ok(Ok(())) => debug!(bean = %self, "bean destroyed"),
      Ok(Err(err)) => error!(bean = %self, error = %err, "could not destroy bean"),
      Err(payload) => error!(
        bean = %self,
        panic = panic_message(payload.as_ref()),
        "could not destroy bean: pre-destroy callback panicked"
      ),
    }
  }

  fn discard(&self) {
    let mut owner = self.owner.lock();
    self.instance.write().take();
    *owner = Weak::new();
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    message
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.as_str()
  } else {
    "non-string panic payload"
  }
}
