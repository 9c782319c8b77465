//! Types shared between the API and DB representations.

/// Our question IDs are integers, assigned by the store.
pub type QuestionId = u32;
/// Our option IDs are integers, assigned by the store.
pub type OptionId = u32;
/// 1-based rank of an option within its question.
pub type PositionIndex = u32;

/// Positions for a freshly submitted option list: `1..=len`, in submission order.
pub fn positions(len: usize) -> impl Iterator<Item = PositionIndex> {
    (1..).take(len)
}
