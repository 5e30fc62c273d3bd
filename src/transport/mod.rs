pub mod tcp;

use std::future::Future;

use crate::errors::QueryError;
use crate::types::AgentEndpoint;

/// Asks one agent for its value.
pub trait Transport {
    fn query(
        &self,
        endpoint: AgentEndpoint,
    ) -> impl Future<Output = Result<u32, QueryError>> + Send;
}
