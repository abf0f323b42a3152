pub mod closer;
pub mod lifetime;

pub use closer::{CloseError, Closer};
pub use lifetime::{Expired, Lifetime};
