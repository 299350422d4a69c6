//! Float helpers that `core` does not provide without `std`.

// Factorial

pub const fn factorial(x: u64) -> u64 {
    let mut result: u64 = 1;
    let mut i: u64 = 1;
    while i <= x {
        result *= i;
        i += 1;
    }
    result
}

pub const fn factorial_reciprocal(x: u64) -> f32 {
    1.0 / (factorial(x) as f32)
}

fn _sin(x: f32) -> f32 {
    // Maclaurin series, accurate on [0, π/2]
    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    let x7 = x5 * x2;
    let x9 = x7 * x2;

    x - factorial_reciprocal(3) * x3 + factorial_reciprocal(5) * x5 - factorial_reciprocal(7) * x7
        + factorial_reciprocal(9) * x9
}

// Sin

/// Computes sin(x), where x is in radians
pub fn sin(x: f32) -> f32 {
    let pi = core::f32::consts::PI;
    // Tau is 2π
    let tau = core::f32::consts::TAU;
    if x < 0.0 {
        return -sin(-x);
    }
    // Bring x into [0, 2π) so the approximation is valid
    let mut x = x % tau;
    // This switches the sign if π < x < 2π
    let multiplier = if x > pi {
        x -= pi;
        -1.0
    } else {
        1.0
    };
    multiplier
        * if x <= core::f32::consts::FRAC_PI_2 {
            _sin(x)
        } else {
            // If π/2 < x <= π
            _sin(pi - x)
        }
}

// Abs / round

pub fn abs(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

/// Rounds a non-negative value to the nearest integer, halves going up. Only interpolated
/// channel values come through here, and those are never negative
pub fn round(x: f32) -> f32 {
    (x + 0.5) as u32 as f32
}

/// Rounds a non-negative value to the nearest index, clamped to `max`
pub fn round_index(x: f32, max: usize) -> usize {
    // NaN and negative values saturate to 0
    let index = (x + 0.5) as usize;
    index.min(max)
}
