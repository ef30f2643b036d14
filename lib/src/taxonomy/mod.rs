mod metadata;
mod document;
mod set;

pub use metadata::*;
pub use document::*;
pub use set::*;
