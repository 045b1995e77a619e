//! The three-stage handler contract implemented by application code.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use girder_transport::Request;

/// Result type for router stages.
///
/// Handlers may raise any error type; a stage error aborts the remaining
/// stages for that request only and never takes down the dispatcher or
/// the connection.
pub type StageResult = Result<(), Box<dyn Error + Send + Sync>>;

/// A message handler registered for one message id.
///
/// The dispatcher runs the stages in order for every dispatched request:
/// `pre_handle`, `handle`, `post_handle`. All three have default no-op
/// bodies, so most implementations override only `handle`.
pub trait Router: Send + Sync + 'static {
    fn pre_handle(&self, _request: &Request) -> impl Future<Output = StageResult> + Send {
        async { Ok(()) }
    }

    fn handle(&self, _request: &Request) -> impl Future<Output = StageResult> + Send {
        async { Ok(()) }
    }

    fn post_handle(&self, _request: &Request) -> impl Future<Output = StageResult> + Send {
        async { Ok(()) }
    }
}

/// Object-safe wrapper for the Router trait, so the route table can hold
/// heterogeneous routers as `Box<dyn RouterDyn>`.
pub(crate) trait RouterDyn: Send + Sync {
    fn pre_handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>>;

    fn handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>>;

    fn post_handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>>;
}

impl<T: Router> RouterDyn for T {
    fn pre_handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>> {
        Box::pin(self.pre_handle(request))
    }

    fn handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>> {
        Box::pin(self.handle(request))
    }

    fn post_handle_dyn<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = StageResult> + Send + 'a>> {
        Box::pin(self.post_handle(request))
    }
}
