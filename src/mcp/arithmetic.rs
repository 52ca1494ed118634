use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("integer overflow in {op}({a}, {b})")]
    Overflow { op: &'static str, a: i64, b: i64 },
    #[error("division by zero")]
    DivisionByZero,
}

pub fn add(a: i64, b: i64) -> Result<i64, ArithmeticError> {
    a.checked_add(b)
        .ok_or(ArithmeticError::Overflow { op: "add", a, b })
}

pub fn subtract(a: i64, b: i64) -> Result<i64, ArithmeticError> {
    a.checked_sub(b)
        .ok_or(ArithmeticError::Overflow { op: "subtract", a, b })
}

pub fn multiply(a: i64, b: i64) -> Result<i64, ArithmeticError> {
    a.checked_mul(b)
        .ok_or(ArithmeticError::Overflow { op: "multiply", a, b })
}

/// True division: the quotient is always a float.
pub fn divide(a: i64, b: i64) -> Result<f64, ArithmeticError> {
    if b == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    Ok(a as f64 / b as f64)
}

/// Shortest round-trip form with a mandatory fractional part and a signed,
/// two-digit exponent (`5.0`, `2.3333333333333335`, `1e+16`, `1.5e-05`).
pub fn format_quotient(value: f64) -> String {
    let repr = format!("{value:?}");
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_operations() {
        assert_eq!(add(5, 3), Ok(8));
        assert_eq!(add(-2, 7), Ok(5));
        assert_eq!(subtract(5, 8), Ok(-3));
        assert_eq!(subtract(-2, -7), Ok(5));
        assert_eq!(multiply(-3, 5), Ok(-15));
        assert_eq!(multiply(0, 999), Ok(0));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(
            add(i64::MAX, 1),
            Err(ArithmeticError::Overflow {
                op: "add",
                a: i64::MAX,
                b: 1
            })
        );
        assert!(subtract(i64::MIN, 1).is_err());
        assert!(multiply(i64::MAX, 2).is_err());
    }

    #[test]
    fn division() {
        assert_eq!(divide(10, 2), Ok(5.0));
        assert_eq!(divide(7, 3), Ok(7.0 / 3.0));
        assert_eq!(divide(1, 0), Err(ArithmeticError::DivisionByZero));
        assert_eq!(divide(0, 0), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn quotients_format_like_floats() {
        assert_eq!(format_quotient(5.0), "5.0");
        assert_eq!(format_quotient(-5.0), "-5.0");
        assert_eq!(format_quotient(0.0), "0.0");
        assert_eq!(format_quotient(7.0 / 3.0), "2.3333333333333335");
        assert_eq!(format_quotient(1e16), "1e+16");
        assert_eq!(format_quotient(i64::MAX as f64), "9.223372036854776e+18");
        assert_eq!(format_quotient(1.5e-5), "1.5e-05");
        assert_eq!(format_quotient(0.0001), "0.0001");
    }
}
