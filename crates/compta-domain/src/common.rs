//! Shared display trait and numeric helpers for bookkeeping primitives.

use rust_decimal::{Decimal, RoundingStrategy};

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Rounds `value` to `scale` decimal places, halves going away from zero.
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}
