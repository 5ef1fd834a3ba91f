use crate::errors::{GeometryError, GeometryResult};
use crate::geometry::{height_color, Dimension, NormalizedPoint};
use std::cmp::Ordering;

/// How normalized coordinates are grouped into axis buckets.
///
/// `Exact` keeps every bit-distinct value as its own axis entry, so two
/// samples meant to share a time step but differing in the last ulp land in
/// separate rows. `Tolerance(eps)` merges runs of sorted values lying within
/// `eps` of the first value of the run (the anchor), and a point is looked up
/// by the greatest anchor not above it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Bucketing {
    #[default]
    Exact,
    Tolerance(f64),
}

impl Bucketing {
    /// Non-positive or non-finite tolerances fall back to exact matching.
    pub fn from_tolerance(eps: f64) -> Self {
        if eps > 0.0 && eps.is_finite() {
            Self::Tolerance(eps)
        } else {
            Self::Exact
        }
    }
}

/// Sorted, deduplicated coordinate values along one grid dimension.
/// Values are lifted from the points themselves, never from fixed bucket edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
    bucketing: Bucketing,
}

impl Axis {
    pub fn build(values: impl IntoIterator<Item = f64>, bucketing: Bucketing) -> Self {
        let mut values: Vec<f64> = values.into_iter().collect();
        values.sort_by(f64::total_cmp);
        match bucketing {
            Bucketing::Exact => values.dedup(),
            // dedup_by hands (current, last retained)
            Bucketing::Tolerance(eps) => values.dedup_by(|cur, anchor| *cur - *anchor <= eps),
        }
        Self { values, bucketing }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Index of the bucket `value` belongs to. Binary search over the axis.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        match self.bucketing {
            Bucketing::Exact => self
                .values
                .binary_search_by(|probe| probe.partial_cmp(&value).unwrap_or(Ordering::Greater))
                .ok(),
            Bucketing::Tolerance(eps) => {
                let pos = self.values.partition_point(|&anchor| anchor <= value);
                let idx = pos.checked_sub(1)?;
                (value - self.values[idx] <= eps).then_some(idx)
            }
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Running sum/count of prices mapped into one (time, volatility) bucket.
#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    sum: f64,
    count: u32,
}

impl Cell {
    #[inline]
    fn add(&mut self, y: f64) {
        self.sum += y;
        self.count += 1;
    }

    /// Empty cells read as 0, not NaN.
    #[inline]
    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Dense `grid_size_x * grid_size_z` vertex grid, row-major by (i, j).
/// Vertex (i, j) sits at `(axis_x[i], average[i][j], axis_z[j])`, which is the
/// layout a regular plane mesh of that resolution expects.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SurfaceGrid {
    pub grid_size_x: usize,
    pub grid_size_z: usize,
    pub axis_x: Vec<f64>,
    pub axis_z: Vec<f64>,
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    /// Number of samples that landed in each cell, same layout as the vertices.
    pub cell_counts: Vec<u32>,
}

impl SurfaceGrid {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.grid_size_x * self.grid_size_z
    }

    pub fn vertex(&self, i: usize, j: usize) -> Option<[f32; 3]> {
        if i >= self.grid_size_x || j >= self.grid_size_z {
            return None;
        }
        let base = (i * self.grid_size_z + j) * 3;
        Some([self.positions[base], self.positions[base + 1], self.positions[base + 2]])
    }

    /// Averaged normalized price of cell (i, j).
    #[inline]
    pub fn average(&self, i: usize, j: usize) -> Option<f32> {
        self.vertex(i, j).map(|v| v[1])
    }

    #[inline]
    pub fn count(&self, i: usize, j: usize) -> Option<u32> {
        if i >= self.grid_size_x || j >= self.grid_size_z {
            return None;
        }
        Some(self.cell_counts[i * self.grid_size_z + j])
    }
}

/// Bucket points onto the (time, volatility) grid and average price per cell.
///
/// All-or-nothing: a lookup miss aborts the call without returning a
/// half-filled grid. The grid is dense in distinct times x distinct
/// volatilities, so its size is checked against `max_vertices` before any
/// cell is allocated.
pub fn aggregate_surface(
    points: &[NormalizedPoint],
    bucketing: Bucketing,
    max_vertices: usize,
) -> GeometryResult<SurfaceGrid> {
    if points.is_empty() {
        return Err(GeometryError::EmptyInput);
    }

    let axis_x = Axis::build(points.iter().map(|p| p.x), bucketing);
    let axis_z = Axis::build(points.iter().map(|p| p.z), bucketing);
    let (size_x, size_z) = (axis_x.len(), axis_z.len());
    let vertex_count = size_x.saturating_mul(size_z);
    if vertex_count > max_vertices {
        return Err(GeometryError::GridTooLarge { vertices: vertex_count, limit: max_vertices });
    }

    let mut cells = vec![Cell::default(); vertex_count];
    for p in points {
        let i = axis_x.index_of(p.x).ok_or(GeometryError::AxisLookupMiss {
            dimension: Dimension::Time,
            value: p.x,
        })?;
        let j = axis_z.index_of(p.z).ok_or(GeometryError::AxisLookupMiss {
            dimension: Dimension::Volatility,
            value: p.z,
        })?;
        cells[i * size_z + j].add(p.y);
    }

    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut colors = Vec::with_capacity(vertex_count * 3);
    let mut cell_counts = Vec::with_capacity(vertex_count);

    for (i, &x) in axis_x.values().iter().enumerate() {
        for (j, &z) in axis_z.values().iter().enumerate() {
            let cell = cells[i * size_z + j];
            let y = cell.average();
            positions.extend_from_slice(&[x as f32, y as f32, z as f32]);
            colors.extend_from_slice(&height_color(y, z));
            cell_counts.push(cell.count);
        }
    }

    Ok(SurfaceGrid {
        grid_size_x: size_x,
        grid_size_z: size_z,
        axis_x: axis_x.into_values(),
        axis_z: axis_z.into_values(),
        positions,
        colors,
        cell_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::normalize::normalize;
    use crate::geometry::Sample;

    fn sample(time: f64, price: f64, volatility: f64) -> Sample {
        Sample { time, price, volatility }
    }

    fn point(x: f64, y: f64, z: f64) -> NormalizedPoint {
        NormalizedPoint { x, y, z, source: sample(x, y, z) }
    }

    fn reference_grid() -> SurfaceGrid {
        let samples = [sample(0.0, 100.0, 0.2), sample(1.0, 110.0, 0.2), sample(1.0, 90.0, 0.3)];
        aggregate_surface(&normalize(&samples).unwrap(), Bucketing::Exact, usize::MAX).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let grid = reference_grid();

        assert_eq!(grid.grid_size_x, 2);
        assert_eq!(grid.grid_size_z, 2);
        assert_eq!(grid.axis_x, vec![0.0, 5.0]);
        assert!((grid.axis_z[0] - 3.333).abs() < 1e-3);
        assert_eq!(grid.axis_z[1], 5.0);

        let expect = |i, j, avg: f32, count: u32| {
            let got = grid.average(i, j).unwrap();
            assert!((got - avg).abs() < 1e-3, "cell ({i},{j}) = {got}, expected {avg}");
            assert_eq!(grid.count(i, j), Some(count));
        };
        expect(0, 0, 4.545, 1);
        expect(1, 0, 5.0, 1);
        expect(1, 1, 4.091, 1);
        expect(0, 1, 0.0, 0);
    }

    #[test]
    fn test_row_major_layout() {
        let grid = reference_grid();
        assert_eq!(grid.positions.len(), 12);
        assert_eq!(grid.colors.len(), 12);

        // Vertex (0, 1): first time step, second volatility step, empty cell
        let v = grid.vertex(0, 1).unwrap();
        assert_eq!(v, [0.0, 0.0, 5.0]);
        assert_eq!(&grid.positions[3..6], &v);
        // Empty cell color: zero height, full volatility
        assert_eq!(&grid.colors[3..6], &[1.0, 0.0, 1.0]);
        assert!(grid.vertex(2, 0).is_none());
    }

    #[test]
    fn test_every_point_counted_once() {
        let samples: Vec<Sample> = (0..50)
            .flat_map(|path| {
                (0..10).map(move |step| {
                    sample(step as f64 * 0.1, 100.0 + path as f64, 0.1 + (path % 5) as f64 * 0.05)
                })
            })
            .collect();
        let points = normalize(&samples).unwrap();
        let grid = aggregate_surface(&points, Bucketing::Exact, usize::MAX).unwrap();

        assert_eq!(grid.grid_size_x, 10);
        assert_eq!(grid.grid_size_z, 5);
        assert_eq!(grid.cell_counts.iter().map(|&c| c as usize).sum::<usize>(), samples.len());
        assert!(grid.positions.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_idempotent() {
        let samples: Vec<Sample> = (0..30)
            .map(|i| sample((i % 6) as f64, 50.0 + i as f64, 0.1 + (i % 4) as f64 * 0.1))
            .collect();
        let points = normalize(&samples).unwrap();
        let a = aggregate_surface(&points, Bucketing::Exact, usize::MAX).unwrap();
        let b = aggregate_surface(&points, Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_row_degenerates_to_line() {
        // All samples share one volatility: grid_size_z == 1
        let samples = [sample(1.0, 10.0, 0.2), sample(2.0, 20.0, 0.2), sample(3.0, 30.0, 0.2)];
        let grid = aggregate_surface(&normalize(&samples).unwrap(), Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!((grid.grid_size_x, grid.grid_size_z), (3, 1));
        assert_eq!(grid.positions.len(), 9);
    }

    #[test]
    fn test_single_point_grid() {
        let grid = aggregate_surface(&[point(5.0, 5.0, 5.0)], Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(grid.vertex_count(), 1);
        assert_eq!(grid.vertex(0, 0), Some([5.0, 5.0, 5.0]));
    }

    #[test]
    fn test_averages_shared_cell() {
        let points = [point(1.0, 2.0, 3.0), point(1.0, 4.0, 3.0), point(1.0, 3.0, 3.0)];
        let grid = aggregate_surface(&points, Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(grid.vertex_count(), 1);
        assert_eq!(grid.average(0, 0), Some(3.0));
        assert_eq!(grid.count(0, 0), Some(3));
    }

    #[test]
    fn test_exact_duplicates_share_bucket() {
        let axis = Axis::build([2.5, 1.0, 2.5, 1.0, 4.0], Bucketing::Exact);
        assert_eq!(axis.values(), &[1.0, 2.5, 4.0]);
        assert_eq!(axis.index_of(2.5), Some(1));
        assert_eq!(axis.index_of(2.6), None);
    }

    #[test]
    fn test_near_duplicates_split_under_exact_matching() {
        let a = 0.1 + 0.2;
        let b = 0.3;
        assert_ne!(a, b);
        let points = [point(a, 1.0, 1.0), point(b, 3.0, 1.0)];
        let grid = aggregate_surface(&points, Bucketing::Exact, usize::MAX).unwrap();
        assert_eq!(grid.grid_size_x, 2);
        assert_eq!(grid.count(0, 0), Some(1));
        assert_eq!(grid.count(1, 0), Some(1));
    }

    #[test]
    fn test_near_duplicates_merge_under_tolerance() {
        let a = 0.1 + 0.2;
        let b = 0.3;
        let points = [point(a, 1.0, 1.0), point(b, 3.0, 1.0), point(2.0, 5.0, 1.0)];
        let grid = aggregate_surface(&points, Bucketing::Tolerance(1e-9), usize::MAX).unwrap();
        assert_eq!(grid.grid_size_x, 2);
        assert_eq!(grid.count(0, 0), Some(2));
        assert_eq!(grid.average(0, 0), Some(2.0));
        // The anchor is the smallest value of the run
        assert_eq!(grid.axis_x[0], b.min(a));
    }

    #[test]
    fn test_tolerance_clusters_anchor_on_first_value() {
        let axis = Axis::build([0.0, 0.4, 0.8, 1.2], Bucketing::Tolerance(0.5));
        // 0.4 merges into 0.0; 0.8 starts a new run; 1.2 merges into 0.8
        assert_eq!(axis.values(), &[0.0, 0.8]);
        assert_eq!(axis.index_of(0.4), Some(0));
        assert_eq!(axis.index_of(1.2), Some(1));
        assert_eq!(axis.index_of(-0.1), None);
        assert_eq!(axis.index_of(1.31), None);
    }

    #[test]
    fn test_lookup_miss_is_reported() {
        let axis = Axis::build([1.0, 2.0], Bucketing::Exact);
        assert_eq!(axis.index_of(f64::NAN), None);
    }

    #[test]
    fn test_bucketing_from_tolerance() {
        assert_eq!(Bucketing::from_tolerance(0.0), Bucketing::Exact);
        assert_eq!(Bucketing::from_tolerance(-1.0), Bucketing::Exact);
        assert_eq!(Bucketing::from_tolerance(f64::NAN), Bucketing::Exact);
        assert_eq!(Bucketing::from_tolerance(0.01), Bucketing::Tolerance(0.01));
    }

    #[test]
    fn test_empty_points() {
        assert_eq!(aggregate_surface(&[], Bucketing::Exact, usize::MAX), Err(GeometryError::EmptyInput));
    }

    #[test]
    fn test_vertex_cap_checked_before_building() {
        // Distinct time and volatility per sample: the grid is n x n
        let samples: Vec<Sample> =
            (1..=10).map(|i| sample(i as f64, 100.0, i as f64 * 0.01)).collect();
        let points = normalize(&samples).unwrap();
        assert_eq!(
            aggregate_surface(&points, Bucketing::Exact, 99),
            Err(GeometryError::GridTooLarge { vertices: 100, limit: 99 })
        );
        let grid = aggregate_surface(&points, Bucketing::Exact, 100).unwrap();
        assert_eq!(grid.vertex_count(), 100);
    }
}
