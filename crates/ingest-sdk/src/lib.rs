pub mod error;
pub mod record;

pub use error::{Cause, LoadError, Result};
pub use record::{RawLine, Record};
