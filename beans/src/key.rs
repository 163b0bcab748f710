//! Type identity and injection request descriptors.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A hashable descriptor of a Rust type, used to index bean definitions and
/// to describe what an injection point asks for.
///
/// Equality and hashing only consider the `TypeId`; the type name is kept for
/// log and error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
  id: TypeId,
  name: &'static str,
}

impl TypeKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.name)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// What an injection point asks the registry for: a type and, optionally,
/// the name of one specific bean.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
  key: TypeKey,
  name: Option<String>,
}

impl Qualifier {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      key: TypeKey::of::<T>(),
      name: None,
    }
  }

  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self {
      key: TypeKey::of::<T>(),
      name: Some(name.to_owned()),
    }
  }

  pub fn key(&self) -> &TypeKey {
    &self.key
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl fmt::Debug for Qualifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Qualifier({}, Name({}))", self.key.name, name),
      None => write!(f, "Qualifier({})", self.key.name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  trait Marker {}

  #[test]
  fn keys_compare_by_type() {
    assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
    assert_ne!(TypeKey::of::<String>(), TypeKey::of::<u32>());
    assert_ne!(TypeKey::of::<dyn Marker>(), TypeKey::of::<String>());

    let set: HashSet<TypeKey> = [TypeKey::of::<u8>(), TypeKey::of::<u8>()].into_iter().collect();
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn qualifier_debug_includes_name() {
    let q = Qualifier::named::<String>("greeting");
    assert_eq!(q.name(), Some("greeting"));
    assert_eq!(format!("{:?}", q), "Qualifier(alloc::string::String, Name(greeting))");
    assert_eq!(Qualifier::of::<u32>().name(), None);
  }
}
