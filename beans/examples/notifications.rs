use fibre_beans::{application_context, resolve, BeanDefinition, Inject, Profiles};

// 1. The abstraction
trait Notifier: Send + Sync {
  fn notify(&self, message: &str);
}

// 2. Two implementations; the console one is preferred
struct ConsoleNotifier;
impl Notifier for ConsoleNotifier {
  fn notify(&self, message: &str) {
    println!("[CONSOLE]: {}", message);
  }
}

struct AuditNotifier;
impl Notifier for AuditNotifier {
  fn notify(&self, message: &str) {
    println!("[AUDIT]: {}", message);
  }
}

// 3. A service that depends on the abstraction, resolved on first use
struct ReportService {
  notifier: Inject<dyn Notifier>,
  audit: Inject<dyn Notifier>,
}

impl ReportService {
  fn generate_report(&self) {
    self.notifier.get().notify("Starting report generation.");
    self.audit.get().notify("report requested");
    self.notifier.get().notify("Finished report generation.");
  }
}

fn main() -> fibre_beans::Result<()> {
  // Only beans whose profile matches are registered.
  application_context().set_environment(Profiles::new(["dev"]));

  // --- Registration ---

  // The service is declared before its dependencies exist.
  BeanDefinition::<ReportService>::new()
    .factory(|| ReportService {
      notifier: Inject::new(),
      audit: Inject::named("audit"),
    })
    .register()?;

  BeanDefinition::<ConsoleNotifier>::new()
    .primary()
    .profile("dev")
    .factory(|| ConsoleNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register()?;

  BeanDefinition::<AuditNotifier>::new()
    .name("audit")
    .factory(|| AuditNotifier)
    .provides::<dyn Notifier>(|notifier| notifier)
    .register()?;

  // --- Resolution and Usage ---
  println!("Resolving the high-level service...");
  let report_service = resolve!(ReportService);

  println!("Using the service...");
  report_service.generate_report();

  fibre_beans::close();
  Ok(())
}
