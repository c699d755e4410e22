use serde_json::Value;

/// Navigation capability the controller depends on
///
/// The concrete navigation stack is an external collaborator; the controller
/// only ever asks for a screen change through this seam. `is_live` lets the
/// controller skip dispatch when the hosting surface has gone away while a
/// transcription round trip was in flight.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Request a screen change
    fn go_to(&self, screen: &str, params: Option<Value>);

    /// Whether the hosting surface can still receive navigation
    fn is_live(&self) -> bool {
        true
    }
}

/// Navigator that logs each request; used by the binary harness
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn go_to(&self, screen: &str, params: Option<Value>) {
        tracing::info!(screen, ?params, "navigate");
    }
}
