use std::sync::Arc;

use tracing::warn;

/// Delivers alert messages. The transport is up to the implementation.
pub trait AlertNotifier {
    fn send(&self, message: &str);
}

impl<T: AlertNotifier + ?Sized> AlertNotifier for &T {
    fn send(&self, message: &str) {
        (**self).send(message)
    }
}

impl<T: AlertNotifier + ?Sized> AlertNotifier for Box<T> {
    fn send(&self, message: &str) {
        (**self).send(message)
    }
}

impl<T: AlertNotifier + ?Sized> AlertNotifier for Arc<T> {
    fn send(&self, message: &str) {
        (**self).send(message)
    }
}

/// Writes alerts to the log at WARN level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn send(&self, message: &str) {
        warn!(target: "vitalwatch::alert", "{}", message);
    }
}

pub fn alert_message(patient_id: &str) -> String {
    format!("Warning, patient with id: {}, need help", patient_id)
}
