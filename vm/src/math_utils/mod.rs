use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use starknet_types_core::felt::NonZeroFelt;

use crate::{types::errors::math_errors::MathError, utils::CAIRO_PRIME, Felt252};

/// Performs integer division between x and y; fails if x is not divisible by y.
pub fn safe_div_usize(x: usize, y: usize) -> Result<usize, MathError> {
    if y == 0 {
        return Err(MathError::DividedByZero);
    }
    let (q, r) = x.div_mod_floor(&y);
    if r != 0 {
        return Err(MathError::SafeDivFailUsize(Box::new((x, y))));
    }
    Ok(q)
}

/// Reduces an arbitrary integer into the field.
pub fn felt_from_bigint(n: &BigInt) -> Felt252 {
    let prime = BigInt::from_biguint(Sign::Plus, CAIRO_PRIME.clone());
    felt_from_biguint(n.mod_floor(&prime).magnitude())
}

pub fn felt_from_biguint(n: &BigUint) -> Felt252 {
    Felt252::from_bytes_be_slice(&n.to_bytes_be())
}

/// The representative of `felt` in `(-P/2, P/2]`.
pub fn signed_felt(felt: &Felt252) -> BigInt {
    let value = felt.to_biguint();
    if value > (&*CAIRO_PRIME >> 1) {
        BigInt::from_biguint(Sign::Minus, &*CAIRO_PRIME - value)
    } else {
        BigInt::from_biguint(Sign::Plus, value)
    }
}

/// `x / y` in the field.
pub fn field_div(x: &Felt252, y: &Felt252) -> Result<Felt252, MathError> {
    let y = NonZeroFelt::try_from(*y).map_err(|_| MathError::DividedByZero)?;
    Ok(x.field_div(&y))
}

/// Adds two points with different x coordinates on a short Weierstrass curve
/// over the field.
pub fn ec_add(
    point_a: (Felt252, Felt252),
    point_b: (Felt252, Felt252),
) -> Result<(Felt252, Felt252), MathError> {
    let slope = field_div(&(point_a.1 - point_b.1), &(point_a.0 - point_b.0))?;
    let x = slope * slope - point_a.0 - point_b.0;
    let y = slope * (point_a.0 - x) - point_a.1;
    Ok((x, y))
}

/// Doubles a point with y != 0 on the curve `y^2 = x^3 + alpha * x + beta`.
pub fn ec_double(
    point: (Felt252, Felt252),
    alpha: &Felt252,
) -> Result<(Felt252, Felt252), MathError> {
    let slope = field_div(
        &(Felt252::THREE * point.0 * point.0 + alpha),
        &(Felt252::TWO * point.1),
    )?;
    let x = slope * slope - Felt252::TWO * point.0;
    let y = slope * (point.0 - x) - point.1;
    Ok((x, y))
}

/// Whether `(x, y)` satisfies `y^2 = x^3 + alpha * x + beta`.
pub fn point_on_curve(x: &Felt252, y: &Felt252, alpha: &Felt252, beta: &Felt252) -> bool {
    y * y == x * x * x + alpha * x + beta
}

/// Smallest power of two greater than or equal to `n`, treating 0 as 1.
pub(crate) fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}
