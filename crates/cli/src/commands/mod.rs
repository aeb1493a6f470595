pub mod check;
pub mod describe;
pub mod ranges;
pub mod source;
pub mod suite;

pub use check::*;
pub use describe::*;
pub use ranges::*;
pub use source::*;
pub use suite::*;
