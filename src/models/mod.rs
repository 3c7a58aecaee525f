pub mod enums;
pub mod follow_up;

pub use enums::*;
pub use follow_up::*;
