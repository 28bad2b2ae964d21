//! Request handlers.
//!
//! A [`Handler`] turns one complete inbound message into an optional outbound
//! message. The reactor invokes exactly one top-level handler per framed
//! message. Multi-stage processing (decode, business logic, encode) is built by
//! composing handlers with [`HandlerExt::and_then`], not by the reactor.
//!
//! Handlers run inline on the reactor thread: a slow handler stalls every
//! connection for that loop iteration.

mod handler_chain;

pub use handler_chain::HandlerChain;

pub trait Handler<Req> {
    type Response;

    /// Returns `None` when no response should be sent for `request`.
    fn handle(&self, request: Req) -> Option<Self::Response>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<Req, Resp, F> Handler<Req> for HandlerFn<F>
where
    F: Fn(Req) -> Option<Resp>,
{
    type Response = Resp;

    fn handle(&self, request: Req) -> Option<Self::Response> {
        (self.f)(request)
    }
}

pub fn make_handler<F, Req, Resp>(f: F) -> HandlerFn<F>
where
    F: Fn(Req) -> Option<Resp>,
{
    HandlerFn { f }
}

pub trait HandlerExt<Req>: Handler<Req> {
    /// Feeds every response of `self` into `next`.
    fn and_then<H>(self, next: H) -> HandlerChain<Self, H>
    where
        Self: Sized,
        H: Handler<Self::Response>,
    {
        HandlerChain::new(self, next)
    }
}

impl<T: Handler<Req> + ?Sized, Req> HandlerExt<Req> for T {}

impl<Req, H: Handler<Req> + ?Sized> Handler<Req> for Box<H> {
    type Response = H::Response;

    fn handle(&self, request: Req) -> Option<Self::Response> {
        (**self).handle(request)
    }
}

impl<Req, H: Handler<Req> + ?Sized> Handler<Req> for std::sync::Arc<H> {
    type Response = H::Response;

    fn handle(&self, request: Req) -> Option<Self::Response> {
        (**self).handle(request)
    }
}
