//! Decimal money arithmetic for cart and order totals.
//!
//! All amounts are in the store currency with two decimal places and are
//! carried as [`Decimal`] end to end (`NUMERIC(10,2)` in the database), so
//! `1.99 * 2 + 3.49` is exactly `7.47`.

use rust_decimal::Decimal;

/// Decimal places kept on stored amounts.
pub const SCALE: u32 = 2;

/// Round an amount to the stored scale, half away from zero like `NUMERIC`.
#[must_use]
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price × quantity`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Savings on one line: `(original − price) × quantity` when the product is
/// marked down, zero otherwise.
#[must_use]
pub fn line_discount(unit_price: Decimal, original_price: Option<Decimal>, quantity: i32) -> Decimal {
    match original_price {
        Some(original) if original > unit_price => (original - unit_price) * Decimal::from(quantity),
        _ => Decimal::ZERO,
    }
}

/// Sum of `price × quantity` over `(price, quantity)` lines.
#[must_use]
pub fn sum_lines<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    round(
        lines
            .into_iter()
            .map(|(price, qty)| line_total(price, qty))
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_lines_exact() {
        let total = sum_lines([(Decimal::new(199, 2), 2), (Decimal::new(349, 2), 1)]);
        assert_eq!(total, Decimal::new(747, 2));
        assert_eq!(total.to_string(), "7.47");
    }

    #[test]
    fn test_sum_lines_empty() {
        assert_eq!(sum_lines(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn test_line_discount() {
        let price = Decimal::new(250, 2);
        assert_eq!(
            line_discount(price, Some(Decimal::new(300, 2)), 3),
            Decimal::new(150, 2)
        );
        assert_eq!(line_discount(price, None, 3), Decimal::ZERO);
        // A stale "original" below the current price is not a discount.
        assert_eq!(
            line_discount(price, Some(Decimal::new(200, 2)), 3),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_round() {
        assert_eq!(round(Decimal::new(12345, 3)), Decimal::new(1235, 2));
    }
}
