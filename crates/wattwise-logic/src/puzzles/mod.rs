//! Concrete mini-games. The quiz lives in [`crate::quiz`].

mod bill;
mod cable;
mod kitchen;
mod tv;

pub use bill::*;
pub use cable::*;
pub use kitchen::*;
pub use tv::*;
