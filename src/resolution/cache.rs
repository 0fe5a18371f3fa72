use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct CachedGame {
    /// Seeded from the store at least once
    loaded: bool,
    /// Bumped on every invalidation
    generation: u64,
    at_bats: HashSet<u32>,
    /// At-bats whose unmapped play signal was already counted
    flagged: HashSet<u32>,
}

/// Process-local record of at-bats already resolved, per game.
///
/// Only a shortcut: the store stays authoritative and every at-bat that is not
/// in here is re-checked against it. Dropping the cache costs latency only.
///
/// Writers read [`generation`](Self::generation) before querying the store and
/// hand it back when recording; a record taken against an older generation is
/// dropped, so an invalidation racing a resolution pass always wins.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    games: Arc<RwLock<HashMap<u64, CachedGame>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_loaded(&self, game_pk: u64) -> bool {
        self.games
            .read()
            .await
            .get(&game_pk)
            .is_some_and(|game| game.loaded)
    }

    pub async fn generation(&self, game_pk: u64) -> u64 {
        self.games
            .read()
            .await
            .get(&game_pk)
            .map_or(0, |game| game.generation)
    }

    /// Seeds a game from the store, merging with anything marked meanwhile.
    /// Returns false, leaving the game unloaded, if it was invalidated since
    /// `generation` was read.
    pub async fn load(&self, game_pk: u64, resolved: HashSet<u32>, generation: u64) -> bool {
        let mut games = self.games.write().await;
        let game = games.entry(game_pk).or_default();
        if game.generation != generation {
            return false;
        }
        game.loaded = true;
        game.at_bats.extend(resolved);
        true
    }

    pub async fn contains(&self, game_pk: u64, at_bat_index: u32) -> bool {
        self.games
            .read()
            .await
            .get(&game_pk)
            .is_some_and(|game| game.at_bats.contains(&at_bat_index))
    }

    /// Records an at-bat as resolved unless the game was invalidated since
    /// `generation` was read
    pub async fn mark_resolved(&self, game_pk: u64, at_bat_index: u32, generation: u64) -> bool {
        let mut games = self.games.write().await;
        let game = games.entry(game_pk).or_default();
        if game.generation != generation {
            return false;
        }
        game.at_bats.insert(at_bat_index)
    }

    /// Forces the next pass to re-check an at-bat against the store
    pub async fn invalidate(&self, game_pk: u64, at_bat_index: u32) {
        let mut games = self.games.write().await;
        let game = games.entry(game_pk).or_default();
        game.generation += 1;
        game.at_bats.remove(&at_bat_index);
    }

    /// True the first time an at-bat is flagged as unmapped
    pub async fn flag_unmapped(&self, game_pk: u64, at_bat_index: u32) -> bool {
        self.games
            .write()
            .await
            .entry(game_pk)
            .or_default()
            .flagged
            .insert(at_bat_index)
    }

    pub async fn resolved_count(&self, game_pk: u64) -> usize {
        self.games
            .read()
            .await
            .get(&game_pk)
            .map_or(0, |game| game.at_bats.len())
    }

    pub async fn clear(&self, game_pk: u64) {
        self.games.write().await.remove(&game_pk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_cold_and_loads_lazily() {
        let cache = ResolutionCache::new();
        assert!(!cache.is_loaded(1).await);
        assert!(!cache.contains(1, 0).await);

        assert!(cache.load(1, HashSet::from([0, 2]), 0).await);
        assert!(cache.is_loaded(1).await);
        assert!(cache.contains(1, 2).await);
        assert!(!cache.contains(1, 1).await);
    }

    #[tokio::test]
    async fn marking_does_not_count_as_loaded() {
        let cache = ResolutionCache::new();
        assert!(cache.mark_resolved(1, 5, 0).await);
        assert!(!cache.is_loaded(1).await);

        cache.load(1, HashSet::from([0]), 0).await;
        assert!(cache.is_loaded(1).await);
        assert_eq!(cache.resolved_count(1).await, 2);
    }

    #[tokio::test]
    async fn invalidation_drops_the_at_bat_and_stale_marks() {
        let cache = ResolutionCache::new();
        cache.mark_resolved(1, 5, 0).await;

        let before = cache.generation(1).await;
        cache.invalidate(1, 5).await;
        assert!(!cache.contains(1, 5).await);

        // a pass that read the store before the invalidation must not re-mark
        assert!(!cache.mark_resolved(1, 5, before).await);
        assert!(!cache.load(1, HashSet::from([5]), before).await);
        assert!(!cache.contains(1, 5).await);
        assert!(!cache.is_loaded(1).await);

        let current = cache.generation(1).await;
        assert!(cache.mark_resolved(1, 5, current).await);
        assert!(cache.contains(1, 5).await);
    }

    #[tokio::test]
    async fn unmapped_at_bats_are_flagged_once() {
        let cache = ResolutionCache::new();
        assert!(cache.flag_unmapped(1, 3).await);
        assert!(!cache.flag_unmapped(1, 3).await);
        assert!(cache.flag_unmapped(2, 3).await);

        cache.clear(1).await;
        assert!(cache.flag_unmapped(1, 3).await);
    }

    #[tokio::test]
    async fn clearing_drops_only_that_game() {
        let cache = ResolutionCache::new();
        cache.mark_resolved(1, 0, 0).await;
        cache.mark_resolved(2, 0, 0).await;

        cache.clear(1).await;
        assert_eq!(cache.resolved_count(1).await, 0);
        assert!(cache.contains(2, 0).await);
    }
}
