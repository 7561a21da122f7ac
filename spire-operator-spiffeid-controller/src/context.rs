use std::sync::Arc;

use spire_operator_authority::{Authority, ListByParent, OperatorIdentity};

pub struct Context<R, S, L = ListByParent> {
    pub authority: Authority<R, L>,
    pub identity: Arc<OperatorIdentity>,
    pub store: S,
}
