use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::GameEvent;

const GAME_CHANNEL_CAPACITY: usize = 100;

/// Per-game broadcast channels for resolution events
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// game_pk -> sender
    game_channels: Arc<RwLock<HashMap<u64, broadcast::Sender<GameEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an event to all subscribers of the event's game
    pub async fn emit(&self, event: GameEvent) {
        let game_pk = event.game_pk();
        let event_type = event.event_type();
        let sender = self.sender_for(game_pk).await;

        match sender.send(event) {
            Ok(receivers) => debug!(game_pk, event_type, receivers, "Game event emitted"),
            Err(_) => debug!(game_pk, event_type, "Game event emitted with no receivers"),
        }
    }

    pub async fn subscribe(&self, game_pk: u64) -> broadcast::Receiver<GameEvent> {
        self.sender_for(game_pk).await.subscribe()
    }

    /// Drops the channel of a finished game
    pub async fn close(&self, game_pk: u64) {
        if self.game_channels.write().await.remove(&game_pk).is_some() {
            debug!(game_pk, "Game channel closed");
        }
    }

    async fn sender_for(&self, game_pk: u64) -> broadcast::Sender<GameEvent> {
        if let Some(sender) = self.game_channels.read().await.get(&game_pk) {
            return sender.clone();
        }

        let mut game_channels = self.game_channels.write().await;
        game_channels
            .entry(game_pk)
            .or_insert_with(|| {
                debug!(game_pk, "Creating game channel");
                broadcast::channel(GAME_CHANNEL_CAPACITY).0
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::AtBatOutcome;

    #[tokio::test]
    async fn subscribers_only_see_their_game() {
        let bus = EventBus::new();
        let mut game_one = bus.subscribe(1).await;
        let mut game_two = bus.subscribe(2).await;

        bus.emit(GameEvent::PredictionsResolved {
            game_pk: 1,
            at_bat_index: 4,
            outcome: AtBatOutcome::Double,
            resolved: 3,
        })
        .await;

        let event = game_one.recv().await.unwrap();
        assert_eq!(event.game_pk(), 1);
        assert_eq!(event.event_type(), "PredictionsResolved");
        assert!(game_two.try_recv().is_err());
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(GameEvent::ResolutionIncomplete {
            game_pk: 7,
            at_bat_index: 0,
            pending: 1,
        })
        .await;
        bus.close(7).await;
    }
}
