//! Request context for correlating log lines across one operation.

use tracing::Span;
use uuid::Uuid;

/// Correlates every log line emitted while handling one operation (a
/// supervisor lifecycle step, a proxy request, a delegation call).
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a new context scoped to `component` (e.g. `"supervisor"`,
    /// `"credential-proxy"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
        }
    }

    /// Attach the specific operation being performed.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Build a tracing span carrying this context's fields. Entering the
    /// span attaches `request_id`/`component`/`operation` to every event
    /// recorded inside it.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("-"),
        )
    }
}

/// Guard returned by entering a [`RequestContext`] span. Dropping it closes
/// the span.
pub type RequestGuard<'a> = tracing::span::Entered<'a>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_contexts_get_distinct_ids() {
        let a = RequestContext::new("supervisor");
        let b = RequestContext::new("supervisor");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn with_operation_is_chainable() {
        let ctx = RequestContext::new("supervisor").with_operation("provision");
        assert_eq!(ctx.operation.as_deref(), Some("provision"));
    }
}
