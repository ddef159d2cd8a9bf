//! Console progress lines
//!
//! ```text
//! iter: 500    | loss:   0.012300 +   0.000200 =     0.0125 | total time:    1.2345
//! ```
//!
//! Each term is printed with six decimals. With more than one term their sum follows in
//! four significant digits.

use std::time::Duration;

/// Progress line for one iteration
pub fn progress_line(iter: usize, terms: &[f64], total: f64, elapsed: Duration) -> String {
    let breakdown = terms
        .iter()
        .map(|&t| term(t))
        .collect::<Vec<_>>()
        .join(" + ");

    let sum = if terms.len() > 1 {
        format!(" = {:>10}", general(total, 4))
    } else {
        String::new()
    };

    format!(
        "iter: {:<6} | loss: {}{} | total time: {:9.4}",
        iter,
        breakdown,
        sum,
        elapsed.as_secs_f64()
    )
}

/// One loss term: six decimals, non-finite values as `nan`/`inf` like the sum
fn term(value: f64) -> String {
    if value.is_finite() {
        format!("{:10.6}", value)
    } else {
        format!("{:>10}", non_finite(value))
    }
}

/// Final status line: the progress line plus the termination reason
pub fn final_line(
    iter: usize,
    terms: &[f64],
    total: f64,
    elapsed: Duration,
    converged: Option<f64>,
) -> String {
    let status = match converged {
        Some(tol) => format!(" <- converged (tol={})", shortest(tol)),
        None => " <- max_iter was reached".to_string(),
    };
    format!("{}{}", progress_line(iter, terms, total, elapsed), status)
}

/// `precision` significant digits, fixed notation for moderate exponents and scientific
/// notation otherwise; fixed output always keeps one decimal digit
pub(crate) fn general(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        return format!("{}e{}", trim_zeros(mantissa), exponent(exp));
    }

    let decimals = (precision as i32 - 1 - exp).max(0) as usize;
    let fixed = format!("{:.*}", decimals, value);
    let fixed = trim_zeros(&fixed);
    if fixed.contains('.') {
        fixed.to_string()
    } else {
        format!("{}.0", fixed)
    }
}

/// Shortest round-trip representation, scientific outside 1e-4..1e16
pub(crate) fn shortest(value: f64) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", value);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            let exp: i32 = exp.parse().unwrap_or(0);
            return format!("{}e{}", mantissa, exponent(exp));
        }
        return sci;
    }
    format!("{:?}", value)
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn exponent(exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}{:02}", sign, exp.abs())
}

fn non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_format() {
        assert_eq!(general(3.0, 4), "3.0");
        assert_eq!(general(1.23456, 4), "1.235");
        assert_eq!(general(0.5, 4), "0.5");
        assert_eq!(general(1234.0, 4), "1234.0");
        assert_eq!(general(12345.6, 4), "1.235e+04");
        assert_eq!(general(0.0001, 4), "0.0001");
        assert_eq!(general(0.00001234, 4), "1.234e-05");
        assert_eq!(general(-2.5, 4), "-2.5");
        assert_eq!(general(9.99999, 4), "10.0");
        assert_eq!(general(0.0, 4), "0.0");
        assert_eq!(general(f64::INFINITY, 4), "inf");
    }

    #[test]
    fn test_shortest_format() {
        assert_eq!(shortest(1e-4), "0.0001");
        assert_eq!(shortest(1e-5), "1e-05");
        assert_eq!(shortest(0.5), "0.5");
        assert_eq!(shortest(1.0), "1.0");
        assert_eq!(shortest(2.5e-7), "2.5e-07");
    }

    #[test]
    fn test_single_term_line() {
        let line = progress_line(0, &[1.0], 1.0, Duration::from_millis(1500));
        assert_eq!(line, "iter: 0      | loss:   1.000000 | total time:    1.5000");
    }

    #[test]
    fn test_multi_term_line() {
        let line = progress_line(500, &[1.0, 2.0], 3.0, Duration::ZERO);
        assert_eq!(
            line,
            "iter: 500    | loss:   1.000000 +   2.000000 =        3.0 | total time:    0.0000"
        );
    }

    #[test]
    fn test_non_finite_terms_match_sum() {
        let line = progress_line(3, &[f64::NAN, 1.0], f64::NAN, Duration::ZERO);
        assert_eq!(
            line,
            "iter: 3      | loss:        nan +   1.000000 =        nan | total time:    0.0000"
        );
        let line = progress_line(3, &[f64::NEG_INFINITY], f64::NEG_INFINITY, Duration::ZERO);
        assert!(line.contains("loss:       -inf |"));
    }

    #[test]
    fn test_final_lines() {
        let converged = final_line(12, &[0.25], 0.25, Duration::ZERO, Some(1e-4));
        assert!(converged.ends_with(" <- converged (tol=0.0001)"));

        let exhausted = final_line(10, &[0.25], 0.25, Duration::ZERO, None);
        assert!(exhausted.ends_with(" <- max_iter was reached"));
        assert!(exhausted.starts_with("iter: 10     | loss:   0.250000"));
    }
}
