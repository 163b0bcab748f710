use fibre_beans::{
  graceful_shutdown, ApplicationContext, BeanDefinition, Cancellation, ShutdownBarrier,
};
use parking_lot::Mutex;
use std::thread;
use std::time::Duration;

struct ConnectionPool {
  open: Mutex<usize>,
}

impl ConnectionPool {
  fn new() -> Self {
    Self {
      open: Mutex::new(0),
    }
  }

  fn connect(&self) {
    *self.open.lock() += 1;
  }
}

fn main() -> fibre_beans::Result<()> {
  let context = ApplicationContext::new();

  BeanDefinition::<ConnectionPool>::new()
    .factory(ConnectionPool::new)
    .post_construct(|pool| println!("pool ready with {} connections", *pool.open.lock()))
    .pre_destroy(|pool| {
      println!("closing {} connections", *pool.open.lock());
      Ok(())
    })?
    .register_in(&context)?;

  let signal = Cancellation::new();
  let barrier = ShutdownBarrier::new();
  graceful_shutdown(&context, &signal, &barrier)?;

  // A worker that keeps using the pool until shutdown is requested.
  barrier.add(1);
  let worker = {
    let context = context.clone();
    let signal = signal.clone();
    let barrier = barrier.clone();
    thread::spawn(move || {
      while !signal.wait_timeout(Duration::from_millis(20)) {
        if let Ok(pool) = context.get::<ConnectionPool>(None) {
          pool.connect();
        }
      }
      barrier.done();
    })
  };

  thread::sleep(Duration::from_millis(100));
  println!("requesting shutdown");
  signal.cancel();

  barrier.wait();
  let _ = worker.join();
  println!("shutdown complete");
  Ok(())
}
