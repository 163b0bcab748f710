//! Profile activation.
//!
//! The registry only asks one question of its environment: does a bean's
//! profile expression match what is active? [`Profiles`] is the default
//! answer, backed by a plain set of names.

use std::collections::HashSet;
use std::env;

/// Name of the environment variable read by [`Profiles::from_env`].
pub const ACTIVE_PROFILES_ENV: &str = "FIBRE_PROFILES_ACTIVE";

/// The collaborator that decides which profile-bound beans are registered.
pub trait Environment: Send + Sync {
  /// Returns `true` if a bean declared with `profiles` should be registered.
  fn matches_profiles(&self, profiles: &[String]) -> bool;

  /// The set of currently active profile names.
  fn active_profiles(&self) -> HashSet<String>;
}

/// A fixed set of active profiles.
///
/// An empty expression list always matches. Otherwise the list matches if
/// any one expression does: `name` when `name` is active, `!name` when it is
/// not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profiles {
  active: HashSet<String>,
}

impl Profiles {
  pub fn new<I, S>(active: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      active: active.into_iter().map(Into::into).collect(),
    }
  }

  /// Parses a comma separated list such as `"dev, local"`. Blank entries are
  /// ignored.
  pub fn parse(list: &str) -> Self {
    Self::new(
      list
        .split(',')
        .map(str::trim)
        .filter(|profile| !profile.is_empty()),
    )
  }

  /// Reads the active profiles from `FIBRE_PROFILES_ACTIVE`. A missing or
  /// non-unicode variable means no profile is active.
  pub fn from_env() -> Self {
    env::var(ACTIVE_PROFILES_ENV)
      .map(|list| Self::parse(&list))
      .unwrap_or_default()
  }

  pub fn is_active(&self, profile: &str) -> bool {
    self.active.contains(profile)
  }

  fn matches(&self, expression: &str) -> bool {
    let expression = expression.trim();
    match expression.strip_prefix('!') {
      Some(negated) => !self.is_active(negated.trim()),
      None => self.is_active(expression),
    }
  }
}

impl Environment for Profiles {
  fn matches_profiles(&self, profiles: &[String]) -> bool {
    profiles.is_empty() || profiles.iter().any(|expression| self.matches(expression))
  }

  fn active_profiles(&self) -> HashSet<String> {
    self.active.clone()
  }
}
