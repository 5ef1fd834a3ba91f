pub mod grid;
pub mod normalize;
pub mod point_cloud;

use crate::errors::GeometryResult;
use grid::{Bucketing, SurfaceGrid};
use point_cloud::PointCloud;

/// Side length of the render-space cube every coordinate is scaled into.
pub const RENDER_EXTENT: f64 = 5.0;

/// One simulation observation. Owned by the caller, only read here.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    pub time: f64,
    pub price: f64,
    pub volatility: f64,
}

/// A sample rescaled into `[0, RENDER_EXTENT]^3`, paired with its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub source: Sample,
}

/// Visualization mode chosen per request. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VizMode {
    #[default]
    Particles,
    Surface,
}

impl std::fmt::Display for VizMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Particles => write!(f, "particles"),
            Self::Surface => write!(f, "surface"),
        }
    }
}

/// Sample field a coordinate was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Time,
    Price,
    Volatility,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Price => write!(f, "price"),
            Self::Volatility => write!(f, "volatility"),
        }
    }
}

/// Renderer-agnostic buffers for one visualization pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Geometry {
    Particles(PointCloud),
    Surface(SurfaceGrid),
}

impl Geometry {
    pub fn mode(&self) -> VizMode {
        match self {
            Self::Particles(_) => VizMode::Particles,
            Self::Surface(_) => VizMode::Surface,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Particles(cloud) => cloud.len(),
            Self::Surface(grid) => grid.vertex_count(),
        }
    }
}

/// Full pipeline: normalize, then branch on mode.
/// Everything is rebuilt from `samples`; nothing carries over between calls.
/// `max_vertices` bounds the surface grid only; a point cloud is linear in the input.
pub fn build_geometry(
    samples: &[Sample],
    mode: VizMode,
    bucketing: Bucketing,
    max_vertices: usize,
) -> GeometryResult<Geometry> {
    let points = normalize::normalize(samples)?;
    let geometry = match mode {
        VizMode::Particles => Geometry::Particles(point_cloud::build_point_cloud(&points)),
        VizMode::Surface => Geometry::Surface(grid::aggregate_surface(&points, bucketing, max_vertices)?),
    };
    tracing::debug!(
        mode = %mode,
        samples = samples.len(),
        vertices = geometry.vertex_count(),
        "geometry built"
    );
    Ok(geometry)
}

/// Red-to-green height gradient with blue driven by volatility.
#[inline]
pub fn height_color(y: f64, z: f64) -> [f32; 3] {
    let ratio = y / RENDER_EXTENT;
    [(1.0 - ratio) as f32, ratio as f32, (z / RENDER_EXTENT) as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GeometryError;

    fn sample(time: f64, price: f64, volatility: f64) -> Sample {
        Sample { time, price, volatility }
    }

    #[test]
    fn test_mode_branch() {
        let samples = [sample(0.0, 100.0, 0.2), sample(1.0, 110.0, 0.2), sample(1.0, 90.0, 0.3)];

        let cloud = build_geometry(&samples, VizMode::Particles, Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(cloud.mode(), VizMode::Particles);
        assert_eq!(cloud.vertex_count(), 3);

        let surface = build_geometry(&samples, VizMode::Surface, Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(surface.mode(), VizMode::Surface);
        assert_eq!(surface.vertex_count(), 4);
    }

    #[test]
    fn test_errors_surface_from_both_modes() {
        for mode in [VizMode::Particles, VizMode::Surface] {
            assert_eq!(
                build_geometry(&[], mode, Bucketing::Exact, usize::MAX),
                Err(GeometryError::EmptyInput)
            );
        }
    }

    #[test]
    fn test_vertex_cap_applies_to_surface_only() {
        let samples = [sample(0.0, 100.0, 0.2), sample(1.0, 110.0, 0.2), sample(1.0, 90.0, 0.3)];
        assert!(build_geometry(&samples, VizMode::Particles, Bucketing::Exact, 3).is_ok());
        assert_eq!(
            build_geometry(&samples, VizMode::Surface, Bucketing::Exact, 3),
            Err(GeometryError::GridTooLarge { vertices: 4, limit: 3 })
        );
    }

    #[test]
    fn test_height_color_extremes() {
        assert_eq!(height_color(0.0, 0.0), [1.0, 0.0, 0.0]);
        assert_eq!(height_color(5.0, 5.0), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_geometry_serializes_with_mode_tag() {
        let samples = [sample(1.0, 1.0, 1.0)];
        let geometry = build_geometry(&samples, VizMode::Particles, Bucketing::Exact, usize::MAX).unwrap();
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["mode"], "particles");
        assert_eq!(json["positions"].as_array().map(|a| a.len()), Some(3));
    }
}
