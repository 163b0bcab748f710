use thiserror::Error;

/// Error type returned by a pre-destroy callback.
pub type DestroyError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for the `fibre_beans` library.
///
/// Configuration and resolution errors describe wiring mistakes. They are not
/// meant to be retried; the fix is to change the declarations.
#[derive(Debug, Error)]
pub enum Error {
  // --- Configuration ---
  #[error("Bean factory method must be provided for {bean}")]
  MissingFactory { bean: String },

  #[error("Bean with name '{0}' already registered")]
  DuplicateName(String),

  #[error("PreDestroy cannot be used for prototype scoped bean {bean}")]
  PrototypePreDestroy { bean: String },

  #[error("{0} scope not supported")]
  UnsupportedScope(String),

  #[error("Bean {bean} is already registered in another application context")]
  ForeignDefinition { bean: String },

  // --- Resolution ---
  #[error("No bean with name '{0}' found")]
  NoSuchName(String),

  #[error("No bean of type {0} found")]
  NoSuchType(&'static str),

  #[error(
    "Multiple beans of type {requested} found. Use name qualifier or mark one of the beans primary: {}",
    .candidates.join("; ")
  )]
  Ambiguous {
    requested: &'static str,
    candidates: Vec<String>,
  },

  #[error(
    "Multiple primary beans of type {requested} found. Use name qualifier or demote extras: {}",
    .candidates.join("; ")
  )]
  MultiplePrimary {
    requested: &'static str,
    candidates: Vec<String>,
  },

  #[error("Cannot cast bean to expected type {requested}; got {actual}")]
  TypeMismatch {
    requested: &'static str,
    actual: &'static str,
  },

  #[error("The application context behind this injection point has been dropped")]
  ContextDropped,

  // --- Lifecycle ---
  #[error("Failed to spawn the shutdown thread: {0}")]
  ShutdownThread(#[source] std::io::Error),
}

impl Error {
  /// Returns `true` for errors raised while declaring or registering beans.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      Error::MissingFactory { .. }
        | Error::DuplicateName(_)
        | Error::PrototypePreDestroy { .. }
        | Error::UnsupportedScope(_)
        | Error::ForeignDefinition { .. }
    )
  }

  /// Returns `true` for errors raised while resolving a bean.
  pub fn is_resolution(&self) -> bool {
    matches!(
      self,
      Error::NoSuchName(_)
        | Error::NoSuchType(_)
        | Error::Ambiguous { .. }
        | Error::MultiplePrimary { .. }
        | Error::TypeMismatch { .. }
        | Error::ContextDropped
    )
  }
}

/// A specialized `Result` type for `fibre_beans` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
