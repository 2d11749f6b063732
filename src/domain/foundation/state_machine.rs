//! Transition table trait for lifecycle status enums.

use super::ValidationError;

/// A status enum with an explicit transition table.
///
/// `can_transition_to` and `valid_transitions` must agree; self-transitions
/// are listed when a status may be re-entered (e.g. a renewal keeps a
/// subscription `Active`).
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    fn can_transition_to(&self, target: &Self) -> bool;

    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns `target` when the table allows it.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "status",
                format!("{:?} cannot move to {:?}", self, target),
            ))
        }
    }

    /// No outgoing transitions at all.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
