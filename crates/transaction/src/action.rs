//! Queued actions and their exception handlers

use conduit_core::{Classify, ErrorKind, ResourceError, ResourceResult};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// What a queued action does to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// Item-store create
    Create,
    /// Item-store update
    Update,
    /// Item-store or blob-store delete
    Delete,
    /// Blob-store write
    Write,
    /// Queue send
    Send,
    /// Queue send with delivery delay
    SendDelayed,
    /// Pub/sub publish
    Publish,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Write => "write",
            ActionKind::Send => "send",
            ActionKind::SendDelayed => "send-delayed",
            ActionKind::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// A resource operation that can be queued in a transaction buffer
pub trait Operation: Send + Sync {
    /// Kind of this operation
    fn kind(&self) -> ActionKind;
}

type HandleFn = Arc<dyn Fn(&ResourceError) -> ResourceResult<()> + Send + Sync>;

/// Recovery for one class of failure raised while applying an action
///
/// If the handler returns `Ok`, the failure is suppressed and commit moves
/// on to the next action.
#[derive(Clone)]
pub struct ActionHandler {
    name: String,
    kind: ErrorKind,
    handle: HandleFn,
}

impl ActionHandler {
    /// Create a handler for failures of class `kind`
    pub fn new<F>(name: impl Into<String>, kind: ErrorKind, handle: F) -> Self
    where
        F: Fn(&ResourceError) -> ResourceResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            handle: Arc::new(handle),
        }
    }

    /// Handler that swallows every failure of class `kind`
    pub fn ignore(kind: ErrorKind) -> Self {
        Self::new(format!("ignore-{}", kind), kind, |_| Ok(()))
    }

    /// Handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handler applies to `error`
    pub fn matches(&self, error: &ResourceError) -> bool {
        self.kind == error.kind()
    }

    /// Run the handler
    pub fn handle(&self, error: &ResourceError) -> ResourceResult<()> {
        (self.handle)(error)
    }
}

impl fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandler")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// One queued mutation plus its handlers, in the order they are tried
#[derive(Debug)]
pub struct Action<Op> {
    op: Op,
    handlers: SmallVec<[ActionHandler; 2]>,
}

impl<Op: Operation> Action<Op> {
    /// Action with no handlers
    pub fn new(op: Op) -> Self {
        Self {
            op,
            handlers: SmallVec::new(),
        }
    }

    /// Append a handler
    pub fn on_error(mut self, handler: ActionHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Append several handlers
    pub fn with_handlers(mut self, handlers: impl IntoIterator<Item = ActionHandler>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Kind of the queued operation
    pub fn kind(&self) -> ActionKind {
        self.op.kind()
    }

    /// The queued operation
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Handlers in the order they are tried
    pub fn handlers(&self) -> &[ActionHandler] {
        &self.handlers
    }

    /// Try the matching handlers in order
    ///
    /// Returns the name of the first matching handler that succeeded, or
    /// `None` if none matched or every matching handler failed.
    pub fn recover(&self, error: &ResourceError) -> Option<&str> {
        self.handlers
            .iter()
            .filter(|handler| handler.matches(error))
            .find(|handler| match handler.handle(error) {
                Ok(()) => true,
                Err(handler_error) => {
                    tracing::debug!(
                        target: "conduit::txn",
                        handler = handler.name(),
                        error = %handler_error,
                        "Action handler failed"
                    );
                    false
                }
            })
            .map(ActionHandler::name)
    }
}
