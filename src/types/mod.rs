pub mod fix;
pub mod mark;
pub mod waypoint;

pub use fix::*;
pub use mark::*;
pub use waypoint::*;
