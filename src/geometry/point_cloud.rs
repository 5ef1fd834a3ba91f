use crate::geometry::{height_color, NormalizedPoint};

/// Parallel position/color buffers, one xyz/rgb triple per sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PointCloud {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl PointCloud {
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Map each point straight to a position and a color. Input order is kept.
pub fn build_point_cloud(points: &[NormalizedPoint]) -> PointCloud {
    let mut positions = Vec::with_capacity(points.len() * 3);
    let mut colors = Vec::with_capacity(points.len() * 3);

    for p in points {
        positions.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        colors.extend_from_slice(&height_color(p.y, p.z));
    }

    PointCloud { positions, colors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::normalize::normalize;
    use crate::geometry::Sample;

    #[test]
    fn test_buffer_lengths_and_order() {
        let samples: Vec<Sample> = (1..=10)
            .map(|i| Sample { time: i as f64, price: 100.0 + i as f64, volatility: 0.2 })
            .collect();
        let points = normalize(&samples).unwrap();
        let cloud = build_point_cloud(&points);

        assert_eq!(cloud.positions.len(), 30);
        assert_eq!(cloud.colors.len(), 30);
        assert_eq!(cloud.len(), 10);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(&cloud.positions[3 * i..3 * i + 3], &[p.x as f32, p.y as f32, p.z as f32]);
        }
    }

    #[test]
    fn test_color_gradient() {
        let points = [
            NormalizedPoint {
                x: 0.0,
                y: 5.0,
                z: 2.5,
                source: Sample { time: 0.0, price: 1.0, volatility: 0.5 },
            },
            NormalizedPoint {
                x: 1.0,
                y: 1.25,
                z: 5.0,
                source: Sample { time: 1.0, price: 0.25, volatility: 1.0 },
            },
        ];
        let cloud = build_point_cloud(&points);
        assert_eq!(&cloud.colors[0..3], &[0.0, 1.0, 0.5]);
        assert_eq!(&cloud.colors[3..6], &[0.75, 0.25, 1.0]);
    }

    #[test]
    fn test_empty_points() {
        let cloud = build_point_cloud(&[]);
        assert!(cloud.is_empty());
        assert!(cloud.colors.is_empty());
    }
}
