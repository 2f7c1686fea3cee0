//! Exception-handler registry
//!
//! Handlers are registered by name with the error classes they accept. When
//! an operation has definitively failed, the executor walks the handler names
//! listed in the [`RetryConfiguration`](crate::RetryConfiguration) and
//! invokes the first registered handler accepting the failure's class, passing
//! it the error and the original call arguments.

use conduit_core::ErrorKind;
use std::collections::HashMap;
use std::fmt;

type HandlerFn<A, T, E> = Box<dyn Fn(&E, &A) -> Result<T, E> + Send + Sync>;

/// A named recovery function for failures of given classes
pub struct ExceptionHandler<A, T, E> {
    name: String,
    accepts: Vec<ErrorKind>,
    handle: HandlerFn<A, T, E>,
}

impl<A, T, E> ExceptionHandler<A, T, E> {
    /// Handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handler accepts failures of `kind`
    ///
    /// A handler registered with no classes accepts every failure.
    pub fn accepts(&self, kind: ErrorKind) -> bool {
        self.accepts.is_empty() || self.accepts.contains(&kind)
    }

    /// Run the handler
    pub fn invoke(&self, error: &E, args: &A) -> Result<T, E> {
        (self.handle)(error, args)
    }
}

impl<A, T, E> fmt::Debug for ExceptionHandler<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .finish()
    }
}

/// Named handlers for operations taking `A` and returning `Result<T, E>`
pub struct HandlerRegistry<A, T, E> {
    handlers: HashMap<String, ExceptionHandler<A, T, E>>,
}

impl<A, T, E> HandlerRegistry<A, T, E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for the given classes
    ///
    /// Registering a name twice replaces the earlier handler.
    pub fn register<F>(
        mut self,
        name: impl Into<String>,
        accepts: impl IntoIterator<Item = ErrorKind>,
        handle: F,
    ) -> Self
    where
        F: Fn(&E, &A) -> Result<T, E> + Send + Sync + 'static,
    {
        let name = name.into();
        self.handlers.insert(
            name.clone(),
            ExceptionHandler {
                name,
                accepts: accepts.into_iter().collect(),
                handle: Box::new(handle),
            },
        );
        self
    }

    /// Register a handler accepting every class
    pub fn register_any<F>(self, name: impl Into<String>, handle: F) -> Self
    where
        F: Fn(&E, &A) -> Result<T, E> + Send + Sync + 'static,
    {
        self.register(name, std::iter::empty::<ErrorKind>(), handle)
    }

    /// Look up a handler by name
    pub fn get(&self, name: &str) -> Option<&ExceptionHandler<A, T, E>> {
        self.handlers.get(name)
    }

    /// First handler, in `names` order, that accepts `kind`
    ///
    /// Names with no registered handler are skipped.
    pub fn select(&self, names: &[String], kind: ErrorKind) -> Option<&ExceptionHandler<A, T, E>> {
        names
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .find(|handler| handler.accepts(kind))
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A, T, E> Default for HandlerRegistry<A, T, E> {
    fn default() -> Self {
        Self::new()
    }
}
