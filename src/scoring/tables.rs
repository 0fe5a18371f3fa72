use crate::outcome::{AtBatOutcome, OutcomeCategory};

/// Points for calling the exact outcome, before the risk multiplier.
/// Rarer outcomes are worth more.
pub fn base_points(outcome: AtBatOutcome) -> u32 {
    use AtBatOutcome::*;

    match outcome {
        HomeRun => 40,
        Triple => 35,
        Double => 20,
        Single => 10,
        Walk => 8,
        IntentWalk => 15,
        HitByPitch => 15,
        Strikeout => 6,
        StrikeoutDoublePlay => 25,
        StrikeoutTriplePlay => 60,
        FieldOut => 4,
        ForceOut => 6,
        FieldersChoice | FieldersChoiceOut => 12,
        GroundedIntoDoublePlay => 15,
        DoublePlay => 18,
        GroundedIntoTriplePlay | TriplePlay => 60,
        SacFly | SacBunt => 14,
        SacFlyDoublePlay | SacBuntDoublePlay => 30,
        FieldError => 14,
        CatcherInterference | BatterInterference | FanInterference => 50,
        _ => 0,
    }
}

/// Risk multiplier applied to exact calls
pub fn risk_multiplier(outcome: AtBatOutcome) -> f64 {
    use AtBatOutcome::*;

    match outcome {
        HomeRun => 2.5,
        Triple => 2.2,
        Double => 1.5,
        Single => 1.2,
        Walk => 1.1,
        IntentWalk => 1.8,
        HitByPitch => 1.6,
        Strikeout => 1.0,
        StrikeoutDoublePlay => 2.0,
        StrikeoutTriplePlay => 3.0,
        FieldOut => 1.0,
        ForceOut => 1.1,
        FieldersChoice | FieldersChoiceOut => 1.4,
        GroundedIntoDoublePlay => 1.5,
        DoublePlay => 1.6,
        GroundedIntoTriplePlay | TriplePlay => 3.0,
        SacFly | SacBunt => 1.5,
        SacFlyDoublePlay | SacBuntDoublePlay => 2.0,
        FieldError => 1.5,
        CatcherInterference | BatterInterference | FanInterference => 3.0,
        _ => 1.0,
    }
}

/// Partial credit for calling the right category only
pub fn category_points(category: OutcomeCategory) -> u32 {
    match category {
        OutcomeCategory::Hit => 3,
        OutcomeCategory::Walk
        | OutcomeCategory::Strikeout
        | OutcomeCategory::Sacrifice
        | OutcomeCategory::HitByPitch => 2,
        OutcomeCategory::Out | OutcomeCategory::Error => 1,
        OutcomeCategory::Baserunning
        | OutcomeCategory::Administrative
        | OutcomeCategory::Unknown => 0,
    }
}

/// Points for an exact call: `round(base × multiplier)`
pub fn exact_points(outcome: AtBatOutcome) -> u32 {
    (base_points(outcome) as f64 * risk_multiplier(outcome)).round() as u32
}
