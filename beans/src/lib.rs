//! # Fibre Beans
//!
//! A thread-safe bean registry with lazy, scope-aware instantiation and
//! ordered teardown.
//!
//! Components declare *how* they are built with a [`BeanDefinition`] and
//! *what* they need with an [`Inject`] field. Nothing has to know the order in
//! which the graph is constructed: injection points resolve on first use.
//!
//! ## Core Concepts
//!
//! - **ApplicationContext**: the registry. One process-wide instance is
//!   available through [`application_context()`]; independent instances can
//!   be created for tests.
//! - **Scope**: a singleton is built once, on first resolution, and shared; a
//!   prototype is built for every resolution.
//! - **Names and primary beans**: a bean can be looked up by name; when several
//!   beans satisfy an unnamed request, the one marked primary wins.
//! - **Profiles**: definitions bound to a profile expression are only
//!   registered when the expression matches the active profiles.
//! - **Lifecycle**: post-construct runs after the factory; pre-destroy runs on
//!   [`ApplicationContext::close`], in reverse order of instantiation.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_beans::{ApplicationContext, BeanDefinition, Inject, Scope};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter;
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     "Hello, World!".to_string()
//!   }
//! }
//!
//! struct Reception {
//!   greeter: Inject<dyn Greeter>,
//! }
//!
//! let context = ApplicationContext::new();
//! let greeter = Inject::<dyn Greeter>::from_context(&context);
//!
//! BeanDefinition::<Reception>::new()
//!   .factory(move || Reception { greeter: greeter.clone() })
//!   .register_in(&context)
//!   .unwrap();
//!
//! BeanDefinition::<EnglishGreeter>::new()
//!   .scope(Scope::Prototype)
//!   .factory(|| EnglishGreeter)
//!   .provides::<dyn Greeter>(|greeter| greeter)
//!   .register_in(&context)
//!   .unwrap();
//!
//! let reception: Arc<Reception> = context.get(None).unwrap();
//! assert_eq!(reception.greeter.get().greet(), "Hello, World!");
//!
//! context.close();
//! ```

mod context;
mod definition;
mod error;
mod global;
mod inject;
mod key;
mod macros;
mod profile;
mod shutdown;
pub mod sync;

pub use context::ApplicationContext;
pub use definition::{BeanDefinition, Scope};
pub use error::{DestroyError, Error, Result};
pub use global::{application_context, close};
pub use inject::Inject;
pub use key::{Qualifier, TypeKey};
pub use profile::{Environment, Profiles, ACTIVE_PROFILES_ENV};
pub use shutdown::{graceful_shutdown, Cancellation, ShutdownBarrier};
