//! Property-style tests for unit conversion.

use era5_common::units::{convert, Conversion, Unit};

const LENGTHS: [Unit; 6] = [
    Unit::Metre,
    Unit::Centimetre,
    Unit::Millimetre,
    Unit::Kilometre,
    Unit::Inch,
    Unit::Foot,
];

const TEMPERATURES: [Unit; 3] = [Unit::Kelvin, Unit::Celsius, Unit::Fahrenheit];

const SAMPLES: [f64; 7] = [0.0, 1e-6, 0.0123, 1.0, 42.5, -17.25, 1234.5678];

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_length_round_trip() {
    for &from in &LENGTHS {
        for &to in &LENGTHS {
            for &v in &SAMPLES {
                let there = convert(v, from, to).unwrap();
                let back = convert(there, to, from).unwrap();
                assert!(close(v, back), "{} {} -> {} -> {}", v, from, to, back);
            }
        }
    }
}

#[test]
fn test_temperature_round_trip() {
    for &from in &TEMPERATURES {
        for &to in &TEMPERATURES {
            for &v in &SAMPLES {
                let back = convert(convert(v, from, to).unwrap(), to, from).unwrap();
                assert!(close(v, back), "{} {} -> {} -> {}", v, from, to, back);
            }
        }
    }
}

#[test]
fn test_inverse_matches_reverse_conversion() {
    let forward = Conversion::new(Unit::Fahrenheit, Unit::Kelvin).unwrap();
    let inverse = forward.inverse();
    let reverse = Conversion::new(Unit::Kelvin, Unit::Fahrenheit).unwrap();
    for &v in &SAMPLES {
        assert!(close(inverse.apply(v), reverse.apply(v)));
    }
}

// ============================================================================
// Linearity
// ============================================================================

#[test]
fn test_length_conversion_is_linear() {
    let conv = Conversion::new(Unit::Metre, Unit::Millimetre).unwrap();
    for &a in &SAMPLES {
        for &b in &SAMPLES {
            assert!(close(conv.apply(a + b), conv.apply(a) + conv.apply(b)));
            assert!(close(conv.apply(3.0 * a), 3.0 * conv.apply(a)));
        }
    }
}

#[test]
fn test_identity_is_exact() {
    let conv = Conversion::new(Unit::Millimetre, Unit::Millimetre).unwrap();
    assert!(conv.is_identity());
    assert_eq!(conv.apply(0.1 + 0.2), 0.1 + 0.2);
}
