use log::{error, info};

/// The toast layer. Receives human-readable strings; styling is its own concern.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Prints notifications for the terminal user and records them in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
        println!("✔ {}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
        eprintln!("✘ {}", message);
    }
}
