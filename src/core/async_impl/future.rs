use crate::core::SlotValue;
use crate::core::context::ActivityContext;
use crate::core::error::ActivityError;
use crate::core::slot::Arguments;
use crate::core::unit::AdapterUnit;
use futures::future::{BoxFuture, FutureExt, TryFutureExt};

impl<A: Arguments, R: SlotValue> AdapterUnit<A, R> {
    /// Resolves the arguments and calls the delegate, returning its future as-is.
    ///
    /// Nothing is spawned or buffered: the host polls the delegate's own future.
    pub fn execute_future(
        &self,
        ctx: &mut ActivityContext,
    ) -> Result<BoxFuture<'static, Result<R, ActivityError>>, ActivityError> {
        self.start(ctx)
    }

    pub(crate) fn start(
        &self,
        ctx: &mut ActivityContext,
    ) -> Result<BoxFuture<'static, Result<R, ActivityError>>, ActivityError> {
        let func = self.async_delegate()?;
        let values = self.arguments.resolve(ctx)?;
        Ok(func(values, ctx.handle(&self.display_name))
            .map_err(ActivityError::Fault)
            .boxed())
    }
}
