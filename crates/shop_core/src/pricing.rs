//! crates/shop_core/src/pricing.rs
//!
//! The single pricing rule used when a product enters a basket and when open
//! baskets are re-priced. `sale_price` on a product is a percentage off the
//! list price; an absent value means no discount.

use crate::ports::PortError;

/// Unit price after the percentage discount.
pub fn final_unit_price(price: f64, discount_percent: Option<f64>) -> f64 {
    let discount = discount_percent.unwrap_or(0.0);
    price - price * discount / 100.0
}

/// Frozen basket line price: discounted unit price times count.
pub fn line_price(price: f64, discount_percent: Option<f64>, count: i32) -> f64 {
    final_unit_price(price, discount_percent) * f64::from(count)
}

pub fn validate_price(price: f64) -> Result<(), PortError> {
    if !price.is_finite() || price < 0.0 {
        return Err(PortError::BadRequest(
            "price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_discount(discount_percent: Option<f64>) -> Result<(), PortError> {
    match discount_percent {
        Some(d) if !d.is_finite() || !(0.0..=100.0).contains(&d) => Err(PortError::BadRequest(
            "sale_price is a discount percentage between 0 and 100".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn validate_count(count: i32) -> Result<(), PortError> {
    if count < 1 {
        return Err(PortError::BadRequest("count must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_discount_is_price_times_count() {
        assert_eq!(line_price(12.5, None, 4), 50.0);
        assert_eq!(line_price(12.5, Some(0.0), 4), 50.0);
    }

    #[test]
    fn discount_is_a_percentage_off() {
        assert_eq!(final_unit_price(200.0, Some(25.0)), 150.0);
        // p * n * (1 - d/100)
        assert_eq!(line_price(80.0, Some(10.0), 3), 216.0);
        assert_eq!(line_price(99.0, Some(100.0), 2), 0.0);
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        assert!(validate_discount(Some(-1.0)).is_err());
        assert!(validate_discount(Some(100.5)).is_err());
        assert!(validate_discount(Some(f64::NAN)).is_err());
        assert!(validate_discount(None).is_ok());
        assert!(validate_price(-0.01).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
        assert!(validate_count(0).is_err());
        assert!(validate_count(1).is_ok());
    }
}
