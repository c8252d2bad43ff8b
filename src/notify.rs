use tracing::{error, info};

/// Tone of a transient status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

/// Receives the engine's transition notifications. Purely observational;
/// the state machine never depends on sink behavior.
pub trait StatusSink: Send {
    fn notify(&mut self, tone: Tone, message: &str);
}

/// Default sink: forwards notifications to tracing.
#[derive(Debug, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify(&mut self, tone: Tone, message: &str) {
        match tone {
            Tone::Info | Tone::Success => info!("{message}"),
            Tone::Error => error!("{message}"),
        }
    }
}
