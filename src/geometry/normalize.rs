use crate::errors::{GeometryError, GeometryResult};
use crate::geometry::{Dimension, NormalizedPoint, Sample, RENDER_EXTENT};

/// Rescale every sample by the per-dimension maximum of the whole set.
///
/// x = time / max_time * 5, y = price / max_price * 5, z = volatility / max_vol * 5
///
/// Output length and order match the input. A maximum that is not strictly
/// positive and finite makes the division meaningless, so it is rejected
/// instead of producing NaN/inf coordinates.
pub fn normalize(samples: &[Sample]) -> GeometryResult<Vec<NormalizedPoint>> {
    if samples.is_empty() {
        return Err(GeometryError::EmptyInput);
    }

    let max_time = checked_max(samples.iter().map(|s| s.time), Dimension::Time, true)?;
    let max_price = checked_max(samples.iter().map(|s| s.price), Dimension::Price, false)?;
    let max_vol = checked_max(samples.iter().map(|s| s.volatility), Dimension::Volatility, true)?;

    Ok(samples
        .iter()
        .map(|s| NormalizedPoint {
            x: s.time / max_time * RENDER_EXTENT,
            y: s.price / max_price * RENDER_EXTENT,
            z: s.volatility / max_vol * RENDER_EXTENT,
            source: *s,
        })
        .collect())
}

/// Time and volatility are clocks and magnitudes; a negative one would land
/// outside the render cube.
fn checked_max(
    values: impl Iterator<Item = f64>,
    dimension: Dimension,
    non_negative: bool,
) -> GeometryResult<f64> {
    let mut max = f64::NEG_INFINITY;
    for v in values {
        // A single NaN/inf poisons the divisor
        if !v.is_finite() {
            return Err(GeometryError::DegenerateRange { dimension, max: v });
        }
        if non_negative && v < 0.0 {
            return Err(GeometryError::NegativeValue { dimension, value: v });
        }
        if v > max {
            max = v;
        }
    }

    if max <= 0.0 {
        return Err(GeometryError::DegenerateRange { dimension, max });
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, price: f64, volatility: f64) -> Sample {
        Sample { time, price, volatility }
    }

    #[test]
    fn test_reference_scenario() {
        let samples = [sample(0.0, 100.0, 0.2), sample(1.0, 110.0, 0.2), sample(1.0, 90.0, 0.3)];
        let points = normalize(&samples).unwrap();

        let expected = [(0.0, 4.545, 3.333), (5.0, 5.0, 3.333), (5.0, 4.091, 5.0)];
        assert_eq!(points.len(), 3);
        for (p, (x, y, z)) in points.iter().zip(expected) {
            assert!((p.x - x).abs() < 1e-3, "x={} expected {x}", p.x);
            assert!((p.y - y).abs() < 1e-3, "y={} expected {y}", p.y);
            assert!((p.z - z).abs() < 1e-3, "z={} expected {z}", p.z);
        }
        assert_eq!(points[2].source, samples[2]);
    }

    #[test]
    fn test_coordinates_bounded() {
        let samples: Vec<Sample> = (0..200)
            .map(|i| {
                let f = i as f64;
                sample(f * 0.01, 80.0 + (f * 0.7).sin() * 20.0, 0.1 + (f % 7.0) * 0.03)
            })
            .collect();
        let points = normalize(&samples).unwrap();
        assert_eq!(points.len(), samples.len());
        for p in &points {
            for c in [p.x, p.y, p.z] {
                assert!((0.0..=RENDER_EXTENT).contains(&c), "coordinate {c} out of range");
            }
        }
        // Each maximum maps exactly to the extent
        assert!(points.iter().any(|p| p.x == RENDER_EXTENT));
        assert!(points.iter().any(|p| p.y == RENDER_EXTENT));
        assert!(points.iter().any(|p| p.z == RENDER_EXTENT));
    }

    #[test]
    fn test_order_preserved() {
        let samples = [sample(3.0, 1.0, 1.0), sample(1.0, 2.0, 1.0), sample(2.0, 3.0, 1.0)];
        let points = normalize(&samples).unwrap();
        let sources: Vec<Sample> = points.iter().map(|p| p.source).collect();
        assert_eq!(sources, samples);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(&[]), Err(GeometryError::EmptyInput));
    }

    #[test]
    fn test_all_zero_price_is_degenerate() {
        let samples = [sample(0.0, 0.0, 0.2), sample(1.0, 0.0, 0.3)];
        assert_eq!(
            normalize(&samples),
            Err(GeometryError::DegenerateRange { dimension: Dimension::Price, max: 0.0 })
        );
    }

    #[test]
    fn test_single_time_zero_is_degenerate() {
        // One sample at t=0: max_time is 0
        let err = normalize(&[sample(0.0, 100.0, 0.2)]).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateRange { dimension: Dimension::Time, .. }));
    }

    #[test]
    fn test_non_finite_field_is_degenerate() {
        let samples = [sample(1.0, 100.0, f64::NAN), sample(2.0, 90.0, 0.2)];
        let err = normalize(&samples).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::DegenerateRange { dimension: Dimension::Volatility, .. }
        ));
    }

    #[test]
    fn test_negative_time_rejected() {
        let samples = [sample(-1.0, 100.0, 0.2), sample(1.0, 100.0, 0.2)];
        assert_eq!(
            normalize(&samples),
            Err(GeometryError::NegativeValue { dimension: Dimension::Time, value: -1.0 })
        );
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let samples = [sample(0.0, 100.0, 0.2), sample(1.0, 100.0, -0.1)];
        let err = normalize(&samples).unwrap_err();
        assert_eq!(err.kind(), "negative_value");
        assert!(matches!(
            err,
            GeometryError::NegativeValue { dimension: Dimension::Volatility, .. }
        ));
    }
}
