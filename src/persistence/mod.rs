//! The registry is the hand-off between `start` and `play`: the
//! shuffled endpoints of the most recently started session, or nothing
//! after `stop`. Readers and writers are not synchronized with each
//! other; callers keep `start`/`stop` and `play` apart in time.

pub mod file;
pub mod memory;

use crate::errors::RegistryError;
use crate::types::AgentEndpoint;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

pub trait Registry {
    /// Replace the contents with `endpoints`, in order.
    fn store(&self, endpoints: &[AgentEndpoint]) -> Result<(), RegistryError>;

    fn load(&self) -> Result<Vec<AgentEndpoint>, RegistryError>;

    fn clear(&self) -> Result<(), RegistryError>;
}
