//! Cart total calculation.

use cart_store::CartLineView;
use common::Money;

/// Computes the total for a set of priced cart lines: Σ(unit price × quantity).
///
/// Pure function of its inputs. Both the cart page total and the amount
/// frozen into an order at commit time go through here, over the same
/// snapshot read, so the displayed and committed totals cannot disagree.
pub fn compute_total(lines: &[CartLineView]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |total, line| total + line.line_total())
}
