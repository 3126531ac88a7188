//! Domain types shared across the engine.

mod bar;
mod position;
mod trade;

pub use bar::Bar;
pub use position::Position;
pub use trade::ClosedTrade;
