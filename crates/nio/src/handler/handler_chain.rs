use crate::handler::Handler;

/// Two handlers applied in sequence, stopping at the first `None`.
#[derive(Debug)]
pub struct HandlerChain<H1, H2> {
    first: H1,
    second: H2,
}

impl<H1, H2> HandlerChain<H1, H2> {
    pub fn new(first: H1, second: H2) -> Self {
        Self { first, second }
    }
}

impl<Req, H1, H2> Handler<Req> for HandlerChain<H1, H2>
where
    H1: Handler<Req>,
    H2: Handler<H1::Response>,
{
    type Response = H2::Response;

    fn handle(&self, request: Req) -> Option<Self::Response> {
        let intermediate = self.first.handle(request)?;
        self.second.handle(intermediate)
    }
}
