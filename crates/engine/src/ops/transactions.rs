use crate::{RequestContext, ResultEngine, Transaction};

use super::Engine;

impl Engine {
    /// Every transaction of the user, in no particular order.
    pub async fn list_transactions(&self, ctx: &RequestContext) -> ResultEngine<Vec<Transaction>> {
        ctx.run(self.expenses.list(ctx.user_id())).await
    }
}
