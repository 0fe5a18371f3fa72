use uuid::Uuid;

use pitchcall::{prediction::Resolution, PredictionRepository};

// ============================================================================
// Resolution Assertions
// ============================================================================

pub async fn assert_resolved(repository: &dyn PredictionRepository, id: Uuid) -> Resolution {
    let prediction = repository
        .get_prediction(id)
        .await
        .expect("store read should succeed")
        .expect("prediction should exist");
    prediction
        .resolution
        .unwrap_or_else(|| panic!("prediction {id} should be resolved"))
}

pub async fn assert_pending(repository: &dyn PredictionRepository, id: Uuid) {
    let prediction = repository
        .get_prediction(id)
        .await
        .expect("store read should succeed")
        .expect("prediction should exist");
    assert!(
        prediction.resolution.is_none(),
        "prediction {id} should still be pending"
    );
}

/// Points and streak fields, ignoring timestamps
pub fn score_of(resolution: &Resolution) -> (u32, u32, u32) {
    (
        resolution.points_earned,
        resolution.streak_count,
        resolution.streak_bonus,
    )
}
