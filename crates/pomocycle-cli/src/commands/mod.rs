pub mod config;
pub mod stats;
pub mod timer;

use pomocycle_core::{
    Database, Event, KvStore, MemoryStore, SessionStore, TimerConfiguration, TimerController,
};

pub type CliResult<T = ()> = pomocycle_core::error::Result<T>;

/// Build a controller over `store`, reporting persistence warnings on stderr.
///
/// An unreadable configuration falls back to the defaults.
pub fn controller_over<S: KvStore + 'static>(store: S) -> TimerController {
    let config = TimerConfiguration::load_or_default();
    let mut controller = TimerController::new(config, SessionStore::new(store));
    controller.subscribe(|event| {
        if let Event::PersistenceWarning { message } = event {
            eprintln!("warning: {message}");
        }
    });
    controller
}

/// The default database, or an in-memory store when it cannot be opened.
pub fn open_store() -> Box<dyn KvStore> {
    match Database::open() {
        Ok(db) => Box::new(db),
        Err(err) => {
            tracing::warn!(error = %err, "database unavailable, state will not be saved");
            eprintln!("warning: {err}; continuing without saving state");
            Box::new(MemoryStore::new())
        }
    }
}

/// Controller over the default store, for one-shot commands.
pub fn open_controller() -> TimerController {
    controller_over(open_store())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
