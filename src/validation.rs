//! Unit scaling, range validation and missing-value normalization.
//!
//! The row driver applies these in a fixed order for every field:
//! normalize sentinels, validate the raw value, scale it, then normalize
//! again. Range bounds are therefore expressed in raw (unscaled) units.

use crate::constants::MISSING_SENTINELS;
use crate::diagnostics::Diagnostics;
use crate::error::ValidationError;
use crate::models::Value;

/// Whether a value represents "missing"
pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => MISSING_SENTINELS.contains(&s.trim()),
        _ => false,
    }
}

/// Replace sentinel values with `Value::Null`. Idempotent.
pub fn normalize_missing(value: Value) -> Value {
    if is_missing(&value) {
        Value::Null
    } else {
        value
    }
}

/// Apply `value * 10^scale + offset`.
///
/// Only numeric values are transformed, and only when both `scale` and
/// `offset` are present; everything else passes through unchanged.
/// Integer inputs with a non-negative integer scale and integer offset
/// stay integers.
pub fn apply_scaling(value: Value, scale: &Value, offset: &Value) -> Result<Value, ValidationError> {
    if !value.is_numeric() || scale.is_null() || offset.is_null() {
        return Ok(value);
    }

    let failure = |reason: &str| ValidationError::Scaling {
        value: value.clone(),
        scale: scale.clone(),
        offset: offset.clone(),
        reason: reason.to_string(),
    };

    if let (Value::Int(v), Value::Int(s), Value::Int(o)) = (&value, scale, offset) {
        if *s >= 0 {
            let exponent = u32::try_from(*s).map_err(|_| failure("scale too large"))?;
            return 10i64
                .checked_pow(exponent)
                .and_then(|factor| v.checked_mul(factor))
                .and_then(|scaled| scaled.checked_add(*o))
                .map(Value::Int)
                .ok_or_else(|| failure("integer overflow"));
        }
    }

    let v = value.as_f64().ok_or_else(|| failure("value is not numeric"))?;
    let s = scale.as_f64().ok_or_else(|| failure("scale is not numeric"))?;
    let o = offset.as_f64().ok_or_else(|| failure("offset is not numeric"))?;

    let scaled = v * 10f64.powf(s) + o;
    if !scaled.is_finite() {
        return Err(failure("result is not finite"));
    }
    Ok(Value::Float(scaled))
}

/// Check a value against inclusive bounds.
///
/// Missing and non-numeric values always pass, as do values where either
/// bound is absent.
pub fn check_range(
    key: &str,
    value: &Value,
    valid_min: &Value,
    valid_max: &Value,
) -> Result<(), ValidationError> {
    let (Some(v), Some(min), Some(max)) = (value.as_f64(), valid_min.as_f64(), valid_max.as_f64())
    else {
        return Ok(());
    };

    if v < min || v > max {
        return Err(ValidationError::Range {
            key: key.to_string(),
            value: value.clone(),
            valid_min: valid_min.clone(),
            valid_max: valid_max.clone(),
        });
    }
    Ok(())
}

/// Range-check a value, nullifying it instead of failing when requested
pub fn validate_range(
    key: &str,
    value: Value,
    valid_min: &Value,
    valid_max: &Value,
    nullify_on_fail: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Value, ValidationError> {
    match check_range(key, &value, valid_min, valid_max) {
        Ok(()) => Ok(value),
        Err(e) if nullify_on_fail => {
            diagnostics.warn(format!("{} Element set to missing", e));
            Ok(Value::Null)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sentinels_are_missing() {
        for sentinel in ["NA", "NaN", "NAN", "None", ""] {
            assert_eq!(normalize_missing(Value::Text(sentinel.into())), Value::Null);
        }
        assert_eq!(normalize_missing(Value::Text("nan".into())), Value::Text("nan".into()));
        assert_eq!(normalize_missing(Value::Int(0)), Value::Int(0));
        assert_eq!(normalize_missing(Value::Null), Value::Null);
    }

    #[test]
    fn test_scaling_pressure_stays_integer() {
        let scaled = apply_scaling(Value::Int(100130), &Value::Int(2), &Value::Int(0)).unwrap();
        assert_eq!(scaled, Value::Int(10013000));
    }

    #[test]
    fn test_scaling_float() {
        let scaled = apply_scaling(Value::Float(10.0), &Value::Int(1), &Value::Float(20.0)).unwrap();
        assert_eq!(scaled, Value::Float(120.0));

        let kelvin =
            apply_scaling(Value::Float(17.0), &Value::Int(0), &Value::Float(273.15)).unwrap();
        assert!((kelvin.as_f64().unwrap() - 290.15).abs() < 1e-9);
    }

    #[test]
    fn test_scaling_negative_scale_gives_float() {
        let scaled = apply_scaling(Value::Int(1013), &Value::Int(-1), &Value::Int(0)).unwrap();
        assert!((scaled.as_f64().unwrap() - 101.3).abs() < 1e-9);
    }

    #[test]
    fn test_scaling_passes_through() {
        let text = Value::Text("ABCD".into());
        assert_eq!(
            apply_scaling(text.clone(), &Value::Int(2), &Value::Int(0)).unwrap(),
            text
        );
        assert_eq!(
            apply_scaling(Value::Int(5), &Value::Null, &Value::Int(1)).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            apply_scaling(Value::Int(5), &Value::Int(1), &Value::Null).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            apply_scaling(Value::Null, &Value::Int(1), &Value::Int(1)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_scaling_overflow() {
        let err = apply_scaling(Value::Int(i64::MAX), &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, ValidationError::Scaling { .. }));

        let err = apply_scaling(Value::Float(1e300), &Value::Int(100), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, ValidationError::Scaling { .. }));
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let min = Value::Float(-90.0);
        let max = Value::Float(90.0);
        assert!(check_range("lat", &Value::Float(-90.0), &min, &max).is_ok());
        assert!(check_range("lat", &Value::Float(90.0), &min, &max).is_ok());
        assert!(check_range("lat", &Value::Float(95.0), &min, &max).is_err());
    }

    #[test]
    fn test_range_needs_both_bounds() {
        assert!(check_range("t", &Value::Int(500), &Value::Int(0), &Value::Null).is_ok());
        assert!(check_range("t", &Value::Int(-500), &Value::Null, &Value::Int(0)).is_ok());
    }

    #[test]
    fn test_range_ignores_text_and_null() {
        let min = Value::Int(0);
        let max = Value::Int(1);
        assert!(check_range("s", &Value::Text("ABCD".into()), &min, &max).is_ok());
        assert!(check_range("s", &Value::Null, &min, &max).is_ok());
    }

    #[test]
    fn test_validate_range_nullify_records_warning() {
        let mut diagnostics = Diagnostics::new();
        let value = validate_range(
            "#1#latitude",
            Value::Float(95.0),
            &Value::Float(-90.0),
            &Value::Float(90.0),
            true,
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(value, Value::Null);
        assert_eq!(diagnostics.warnings().len(), 1);
        assert!(diagnostics.warnings()[0].contains("#1#latitude"));
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_validate_range_strict_fails() {
        let mut diagnostics = Diagnostics::new();
        let err = validate_range(
            "test value",
            Value::Float(10.0),
            &Value::Float(0.0),
            &Value::Float(9.9),
            false,
            &mut diagnostics,
        )
        .unwrap_err();

        match err {
            ValidationError::Range { key, value, .. } => {
                assert_eq!(key, "test value");
                assert_eq!(value, Value::Float(10.0));
            }
            other => panic!("Expected range error, got {:?}", other),
        }
        assert!(diagnostics.is_empty());
    }

    proptest! {
        #[test]
        fn prop_range_inclusivity(v in -1e6f64..1e6, a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let mut diagnostics = Diagnostics::new();
            let result = validate_range(
                "k", Value::Float(v), &Value::Float(min), &Value::Float(max), false, &mut diagnostics,
            );
            prop_assert_eq!(result.is_ok(), min <= v && v <= max);
            if let Ok(value) = result {
                prop_assert_eq!(value, Value::Float(v));
            }
        }

        #[test]
        fn prop_nullify_never_fails(v in -1e6f64..1e6, a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let mut diagnostics = Diagnostics::new();
            let value = validate_range(
                "k", Value::Float(v), &Value::Float(min), &Value::Float(max), true, &mut diagnostics,
            ).unwrap();
            prop_assert_eq!(value.is_null(), v < min || v > max);
        }

        #[test]
        fn prop_scaling_formula(v in -1e4f64..1e4, s in -3i64..4, o in -1e3f64..1e3) {
            let scaled = apply_scaling(Value::Float(v), &Value::Int(s), &Value::Float(o)).unwrap();
            let expected = v * 10f64.powi(s as i32) + o;
            prop_assert!((scaled.as_f64().unwrap() - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            prop_assert_eq!(apply_scaling(Value::Float(v), &Value::Null, &Value::Float(o)).unwrap(), Value::Float(v));
            prop_assert_eq!(apply_scaling(Value::Float(v), &Value::Int(s), &Value::Null).unwrap(), Value::Float(v));
        }
    }
}
