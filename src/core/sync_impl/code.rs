use crate::core::SlotValue;
use crate::core::context::ActivityContext;
use crate::core::error::ActivityError;
use crate::core::slot::Arguments;
use crate::core::unit::AdapterUnit;

impl<A: Arguments, R: SlotValue> AdapterUnit<A, R> {
    /// Resolves every argument in order, then calls the delegate inline.
    ///
    /// A resolution failure returns before the delegate is touched. A delegate
    /// error comes back as [`ActivityError::Fault`] holding the original error.
    pub fn run_sync(&self, ctx: &mut ActivityContext) -> Result<R, ActivityError> {
        let func = self.sync_delegate()?;
        let values = self.arguments.resolve(ctx)?;
        func(values, ctx.handle(&self.display_name)).map_err(ActivityError::Fault)
    }
}
