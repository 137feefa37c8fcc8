pub mod dzt;
pub mod dzx;
pub mod gpx;
pub mod main;
pub mod stream;

pub use dzt::*;
pub use dzx::*;
pub use self::gpx::*;
pub use main::*;
pub use stream::*;
