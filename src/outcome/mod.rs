// Canonical outcome taxonomy and the classifier that maps raw play data onto it

pub use classifier::{
    classify_result, Classification, ClassificationSource, OutcomeClassifier, UnmappedEvents,
    DEFAULT_OUTCOME,
};
pub use types::{AtBatOutcome, OutcomeCategory, UnknownValue};

mod classifier;
mod types;
