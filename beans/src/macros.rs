//! Public macros for resolving beans from the process-wide context.

/// Resolves a bean from the process-wide context.
///
/// Unnamed forms pick the single eligible bean, or the primary one when
/// several are eligible. Named forms look the bean up by name.
///
/// # Panics
///
/// Panics if the bean cannot be resolved. For a non-panicking version, use
/// `application_context().get(...)` directly.
///
/// # Examples
///
/// ```
/// use fibre_beans::{resolve, BeanDefinition};
///
/// BeanDefinition::<String>::new()
///   .name("macro_greeting")
///   .factory(|| String::from("hello"))
///   .register()
///   .unwrap();
///
/// let message = resolve!(String, "macro_greeting");
/// assert_eq!(*message, "hello");
/// ```
///
/// ```
/// use fibre_beans::{resolve, BeanDefinition};
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// BeanDefinition::<EnglishGreeter>::new()
///   .factory(|| EnglishGreeter)
///   .provides::<dyn Greeter>(|greeter| greeter)
///   .register()
///   .unwrap();
///
/// let greeter = resolve!(trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
    // resolve!(trait MyTrait)
    (trait $trait_ident:ident) => {
        $crate::application_context()
            .get::<dyn $trait_ident>(None)
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait bean {}: {}",
                    std::any::type_name::<dyn $trait_ident>(),
                    err
                )
            })
    };

    // resolve!(trait MyTrait, "name")
    (trait $trait_ident:ident, $name:expr) => {
        $crate::application_context()
            .get::<dyn $trait_ident>(Some($name))
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required trait bean {} named '{}': {}",
                    std::any::type_name::<dyn $trait_ident>(),
                    $name,
                    err
                )
            })
    };

    // resolve!(MyBean)
    ($type:ty) => {
        $crate::application_context()
            .get::<$type>(None)
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required bean {}: {}",
                    std::any::type_name::<$type>(),
                    err
                )
            })
    };

    // resolve!(MyBean, "name")
    ($type:ty, $name:expr) => {
        $crate::application_context()
            .get::<$type>(Some($name))
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required bean {} named '{}': {}",
                    std::any::type_name::<$type>(),
                    $name,
                    err
                )
            })
    };
}
