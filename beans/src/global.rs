//! The process-wide application context and access functions.

use crate::context::ApplicationContext;
use once_cell::sync::Lazy;

// Created on first access in a thread-safe manner. Active profiles are read
// from the environment at that moment.
static APPLICATION_CONTEXT: Lazy<ApplicationContext> = Lazy::new(ApplicationContext::from_env);

/// Provides a reference to the process-wide context.
///
/// # Examples
///
/// ```
/// use fibre_beans::{application_context, BeanDefinition};
///
/// BeanDefinition::<u16>::new()
///   .name("global_port")
///   .factory(|| 8080)
///   .register()
///   .unwrap();
///
/// let port = application_context().get::<u16>(Some("global_port")).unwrap();
/// assert_eq!(*port, 8080);
/// ```
pub fn application_context() -> &'static ApplicationContext {
  &APPLICATION_CONTEXT
}

/// Closes the process-wide context. It stays usable as an empty context.
pub fn close() {
  application_context().close();
}
