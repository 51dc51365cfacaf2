//! The logistic activation used by every non-bias unit.

/// Smallest distance an activation keeps from 0 and 1.
const SATURATION_MARGIN: f64 = f64::EPSILON;

/// Evaluates the [logistic function](https://en.wikipedia.org/wiki/Logistic_function)
/// `1 / (1 + e^-x)`.
///
/// The result is kept strictly inside `(0, 1)`, so `sigmoid_prime` never
/// vanishes on a saturated unit.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let y = 1.0 / (1.0 + (-x).exp());
    y.clamp(SATURATION_MARGIN, 1.0 - SATURATION_MARGIN)
}

/// Evaluates the derivative of the logistic function, where `y = sigmoid(x)`.
///
/// Note that this function takes in the *output* of the activation
/// function, rather than the input. This means we never have to keep the
/// net input around once a unit has been squashed.
#[inline]
pub fn sigmoid_prime(y: f64) -> f64 {
    y * (1.0 - y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centred_at_zero() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid_prime(0.5), 0.25);
    }

    #[test]
    fn sigmoid_stays_inside_open_unit_interval() {
        let mut x = -1000.0;
        while x <= 1000.0 {
            let y = sigmoid(x);
            assert!(y > 0.0 && y < 1.0, "sigmoid({}) = {}", x, y);
            assert!(sigmoid_prime(y) > 0.0);
            x += 0.25;
        }
        assert!(sigmoid(f64::MAX) < 1.0);
        assert!(sigmoid(f64::MIN) > 0.0);
    }

    #[test]
    fn sigmoid_is_monotonic() {
        let mut prev = sigmoid(-10.0);
        for step in 1..=200 {
            let y = sigmoid(-10.0 + step as f64 * 0.1);
            assert!(y > prev);
            prev = y;
        }
    }
}
