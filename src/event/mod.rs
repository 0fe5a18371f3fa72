// Resolution events, published per game

pub use bus::EventBus;
pub use events::GameEvent;

mod bus;
mod events;
