mod common;

use fibre_beans::{ApplicationContext, BeanDefinition, Error, Inject, Qualifier, Scope};
use parking_lot::Mutex;
use std::sync::Arc;

// --- Test Fixtures ---

trait Notifier: Send + Sync + std::fmt::Debug {
  fn channel(&self) -> &'static str;
}

#[derive(Debug)]
struct EmailNotifier;
impl Notifier for EmailNotifier {
  fn channel(&self) -> &'static str {
    "email"
  }
}

#[derive(Debug)]
struct SmsNotifier;
impl Notifier for SmsNotifier {
  fn channel(&self) -> &'static str {
    "sms"
  }
}

#[derive(Debug)]
struct PushNotifier;
impl Notifier for PushNotifier {
  fn channel(&self) -> &'static str {
    "push"
  }
}

#[derive(Debug, Default)]
struct Counter {
  count: Mutex<u32>,
}

impl Counter {
  fn increment(&self) -> u32 {
    let mut count = self.count.lock();
    *count += 1;
    *count
  }
}

fn register_notifiers(context: &ApplicationContext, primary_email: bool, primary_sms: bool) {
  let mut email = BeanDefinition::<EmailNotifier>::new()
    .factory(|| EmailNotifier)
    .provides::<dyn Notifier>(|notifier| notifier);
  if primary_email {
    email = email.primary();
  }
  email.register_in(context).unwrap();

  let mut sms = BeanDefinition::<SmsNotifier>::new()
    .factory(|| SmsNotifier)
    .provides::<dyn Notifier>(|notifier| notifier);
  if primary_sms {
    sms = sms.primary();
  }
  sms.register_in(context).unwrap();

  BeanDefinition::<PushNotifier>::new()
    .factory(|| PushNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(context)
    .unwrap();
}

// --- Names ---

#[test]
fn test_all_names_of_a_singleton_share_one_instance() {
  common::init_tracing();
  let context = ApplicationContext::new();

  BeanDefinition::<Counter>::new()
    .names(["hits", "visits"])
    .factory(Counter::default)
    .register_in(&context)
    .unwrap();

  let hits = context.get::<Counter>(Some("hits")).unwrap();
  let visits = context.get::<Counter>(Some("visits")).unwrap();

  assert!(Arc::ptr_eq(&hits, &visits));
  hits.increment();
  assert_eq!(visits.increment(), 2);
}

#[test]
fn test_all_names_of_a_prototype_yield_independent_instances() {
  common::init_tracing();
  let context = ApplicationContext::new();

  BeanDefinition::<Counter>::new()
    .names(["left", "right"])
    .scope(Scope::Prototype)
    .factory(Counter::default)
    .register_in(&context)
    .unwrap();

  let left = context.get::<Counter>(Some("left")).unwrap();
  let right = context.get::<Counter>(Some("right")).unwrap();

  assert!(!Arc::ptr_eq(&left, &right));
  left.increment();
  left.increment();
  assert_eq!(right.increment(), 1);
}

#[test]
fn test_unknown_name_is_not_found() {
  let context = ApplicationContext::new();
  let err = context.get::<Counter>(Some("missing")).unwrap_err();
  assert!(matches!(err, Error::NoSuchName(ref name) if name == "missing"));
  assert!(err.is_resolution());
}

#[test]
fn test_named_bean_of_wrong_type_is_a_type_mismatch() {
  let context = ApplicationContext::new();
  BeanDefinition::<Counter>::new()
    .name("counter")
    .factory(Counter::default)
    .register_in(&context)
    .unwrap();

  let err = context.get::<EmailNotifier>(Some("counter")).unwrap_err();
  let message = err.to_string();
  assert!(matches!(err, Error::TypeMismatch { .. }));
  assert!(message.contains("EmailNotifier"), "{}", message);
  assert!(message.contains("Counter"), "{}", message);
}

// --- Scopes ---

#[test]
fn test_prototype_factory_runs_per_resolution() {
  common::init_tracing();
  let context = ApplicationContext::new();
  let created = Arc::new(Mutex::new(0));
  let observed = Arc::clone(&created);

  BeanDefinition::<Counter>::new()
    .scope(Scope::Prototype)
    .factory(move || {
      *observed.lock() += 1;
      Counter::default()
    })
    .register_in(&context)
    .unwrap();

  let first = context.get::<Counter>(None).unwrap();
  let second = context.get::<Counter>(None).unwrap();

  assert_eq!(*created.lock(), 2);
  assert_eq!(first.increment(), 1);
  assert_eq!(first.increment(), 2);
  assert_eq!(second.increment(), 1);
}

#[test]
fn test_post_construct_runs_for_every_prototype() {
  let context = ApplicationContext::new();

  BeanDefinition::<Counter>::new()
    .scope(Scope::Prototype)
    .factory(Counter::default)
    .post_construct(|counter| {
      counter.increment();
    })
    .register_in(&context)
    .unwrap();

  assert_eq!(context.get::<Counter>(None).unwrap().increment(), 2);
  assert_eq!(context.get::<Counter>(None).unwrap().increment(), 2);
}

// --- Unnamed Resolution ---

#[test]
fn test_single_candidate_resolves_by_capability() {
  let context = ApplicationContext::new();
  BeanDefinition::<EmailNotifier>::new()
    .factory(|| EmailNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();

  let by_trait = context.get::<dyn Notifier>(None).unwrap();
  let by_type = context.get::<EmailNotifier>(None).unwrap();
  assert_eq!(by_trait.channel(), "email");

  // Both requests are served by the same singleton.
  let by_trait_ptr = Arc::as_ptr(&by_trait) as *const ();
  let by_type_ptr = Arc::as_ptr(&by_type) as *const ();
  assert_eq!(by_trait_ptr, by_type_ptr);
}

#[test]
fn test_primary_wins_over_other_candidates() {
  common::init_tracing();
  let context = ApplicationContext::new();
  register_notifiers(&context, false, true);

  let notifier = context.get::<dyn Notifier>(None).unwrap();
  assert_eq!(notifier.channel(), "sms");

  // Concrete requests are unaffected by the primary flag.
  assert_eq!(context.get::<EmailNotifier>(None).unwrap().channel(), "email");
}

#[test]
fn test_two_primaries_are_ambiguous() {
  common::init_tracing();
  let context = ApplicationContext::new();
  register_notifiers(&context, true, true);

  let err = context.get::<dyn Notifier>(None).unwrap_err();
  match err {
    Error::MultiplePrimary {
      requested,
      candidates,
    } => {
      assert!(requested.contains("Notifier"));
      assert_eq!(candidates.len(), 2);
    }
    other => panic!("unexpected error: {}", other),
  }
}

#[test]
fn test_several_candidates_without_primary_are_ambiguous() {
  let context = ApplicationContext::new();
  register_notifiers(&context, false, false);

  let err = context.get::<dyn Notifier>(None).unwrap_err();
  assert!(matches!(err, Error::Ambiguous { ref candidates, .. } if candidates.len() == 3));
  assert!(err.to_string().contains("mark one of the beans primary"));
}

#[test]
fn test_no_candidate_is_not_found() {
  let context = ApplicationContext::new();
  let err = context.get::<dyn Notifier>(None).unwrap_err();
  assert!(matches!(err, Error::NoSuchType(_)));
}

#[test]
fn test_named_lookup_bypasses_ambiguity() {
  let context = ApplicationContext::new();
  register_notifiers(&context, false, false);
  BeanDefinition::<PushNotifier>::new()
    .name("urgent")
    .factory(|| PushNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();

  assert_eq!(
    context.get::<dyn Notifier>(Some("urgent")).unwrap().channel(),
    "push"
  );
}

#[test]
fn test_erased_lookup_holds_requested_arc() {
  let context = ApplicationContext::new();
  BeanDefinition::<EmailNotifier>::new()
    .factory(|| EmailNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();

  let instance = context.bean(&Qualifier::of::<dyn Notifier>()).unwrap();
  let notifier = instance.downcast::<Arc<dyn Notifier>>().unwrap();
  assert_eq!(notifier.channel(), "email");
}

// --- Injection Points ---

#[test]
fn test_inject_resolves_lazily_and_once() {
  common::init_tracing();
  let context = ApplicationContext::new();
  let counter = Inject::<Counter>::named_from(&context, "lazy");

  // Declared before the bean exists; nothing is looked up yet.
  assert!(!counter.is_resolved());

  BeanDefinition::<Counter>::new()
    .name("lazy")
    .scope(Scope::Prototype)
    .factory(Counter::default)
    .register_in(&context)
    .unwrap();

  let first = counter.get();
  let second = counter.get();
  assert!(counter.is_resolved());
  // A prototype behind one injection point is still resolved only once.
  assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_inject_accessor_closure() {
  let context = ApplicationContext::new();
  BeanDefinition::<SmsNotifier>::new()
    .factory(|| SmsNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();

  let notifier = Inject::<dyn Notifier>::from_context(&context).resolve();
  assert_eq!(notifier().channel(), "sms");
  assert_eq!(notifier().channel(), "sms");
}

#[test]
fn test_inject_failure_is_reported_and_not_memoized() {
  let context = ApplicationContext::new();
  let notifier = Inject::<dyn Notifier>::from_context(&context);

  assert!(matches!(notifier.try_get(), Err(Error::NoSuchType(_))));
  assert!(!notifier.is_resolved());

  BeanDefinition::<EmailNotifier>::new()
    .factory(|| EmailNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();
  assert_eq!(notifier.try_get().unwrap().channel(), "email");
}

#[test]
#[should_panic(expected = "Failed to inject")]
fn test_inject_get_panics_on_missing_bean() {
  let context = ApplicationContext::new();
  Inject::<Counter>::from_context(&context).get();
}

#[test]
fn test_inject_outliving_its_context() {
  let context = ApplicationContext::new();
  let counter = Inject::<Counter>::from_context(&context);
  drop(context);

  assert!(matches!(counter.try_get(), Err(Error::ContextDropped)));
}

#[test]
fn test_factories_can_capture_injection_points() {
  struct Dispatcher {
    notifier: Inject<dyn Notifier>,
  }

  let context = ApplicationContext::new();
  let notifier = Inject::<dyn Notifier>::from_context(&context);

  // Registered before its dependency; the dependency resolves on first use.
  BeanDefinition::<Dispatcher>::new()
    .factory(move || Dispatcher {
      notifier: notifier.clone(),
    })
    .register_in(&context)
    .unwrap();
  BeanDefinition::<PushNotifier>::new()
    .factory(|| PushNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register_in(&context)
    .unwrap();

  let dispatcher = context.get::<Dispatcher>(None).unwrap();
  assert_eq!(dispatcher.notifier.get().channel(), "push");
}
