use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Boxed error accepted as the cause of a [`ServiceError`]
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// An error tagged with the name of the service that produced it.
///
/// Several services may fail at the same time; carrying the name keeps their
/// failures distinguishable once they reach the supervisor. A value without a
/// cause stands for "no error" and is what a clean [`stop`] returns.
///
/// [`stop`]: crate::service::Service::stop
#[derive(Clone)]
pub struct ServiceError {
    name: String,
    cause: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl ServiceError {
    /// Wrap `cause` with the service name
    pub fn new<N, E>(name: N, cause: E) -> Self
    where
        N: Into<String>,
        E: Into<BoxError>,
    {
        let cause: BoxError = cause.into();
        Self::build(name.into(), Some(Arc::from(cause)))
    }

    /// A value carrying no error, used for a clean stop
    pub fn none<N: Into<String>>(name: N) -> Self {
        Self::build(name.into(), None)
    }

    /// Convert the outcome of a fallible operation
    pub fn from_result<N, E>(name: N, result: std::result::Result<(), E>) -> Self
    where
        N: Into<String>,
        E: Into<BoxError>,
    {
        match result {
            Ok(()) => Self::none(name),
            Err(e) => Self::new(name, e),
        }
    }

    fn build(name: String, cause: Option<Arc<dyn Error + Send + Sync + 'static>>) -> Self {
        if name.is_empty() {
            warn!("ServiceError constructed with an empty service name");
        }

        Self { name, cause }
    }

    /// Whether a cause is present
    pub fn has_error(&self) -> bool {
        self.cause.is_some()
    }

    /// Name of the originating service
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.name, cause),
            None => write!(f, "{}: no error", self.name),
        }
    }
}

impl fmt::Debug for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceError")
            .field("name", &self.name)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}
