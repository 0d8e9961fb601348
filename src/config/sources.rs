//! Config sources, applied in precedence order by the facade.

pub mod environment;
pub mod global_file;
pub mod workspace_file;
