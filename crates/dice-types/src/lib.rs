pub mod bet;
pub mod delivery;
pub mod events;
pub mod outcome;
pub mod session;

pub use bet::*;
pub use delivery::*;
pub use events::*;
pub use outcome::*;
pub use session::*;
