//! Per-dimension [min, max) bounds describing the coordinate region a box is
//! responsible for, plus the spatial-filter seam used by tree queries.

use crate::error::Error;
use crate::event::MAX_ND;

/// Bounds are half-open per dimension: a coordinate equal to `max[d]` belongs
/// to the neighboring box. Extents are immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MDExtents {
    pub min: [f32; MAX_ND],
    pub max: [f32; MAX_ND],
    pub nd: usize,
}

impl MDExtents {
    pub fn new(nd: usize, min: &[f32], max: &[f32]) -> Result<Self, Error> {
        if nd == 0 || nd > MAX_ND {
            return Err(Error::Config(format!(
                "nd must be between 1 and {}, got {}",
                MAX_ND, nd
            )));
        }
        if min.len() < nd || max.len() < nd {
            return Err(Error::Config(format!(
                "extents need {} bounds, got {}/{}",
                nd,
                min.len(),
                max.len()
            )));
        }

        let mut min_arr = [0f32; MAX_ND];
        let mut max_arr = [0f32; MAX_ND];
        for d in 0..nd {
            if min[d] > max[d] {
                return Err(Error::Config(format!(
                    "extents inverted in dimension {}: [{}, {})",
                    d, min[d], max[d]
                )));
            }
            min_arr[d] = min[d];
            max_arr[d] = max[d];
        }

        return Ok(Self {
            min: min_arr,
            max: max_arr,
            nd,
        });
    }

    /// Same `[lo, hi)` range in every dimension.
    pub fn uniform(nd: usize, lo: f32, hi: f32) -> Result<Self, Error> {
        return Self::new(nd, &[lo; MAX_ND][..nd], &[hi; MAX_ND][..nd]);
    }

    pub fn width(&self, d: usize) -> f32 {
        return self.max[d] - self.min[d];
    }

    pub fn contains(&self, coords: &[f32; MAX_ND]) -> bool {
        for d in 0..self.nd {
            if coords[d] < self.min[d] || coords[d] >= self.max[d] {
                return false;
            }
        }
        return true;
    }

    /// Containment with a per-dimension slack proportional to the box width.
    /// Routing clamps boundary coordinates into edge cells, so events stored
    /// in an edge cell may sit a rounding error outside its exact bounds.
    pub fn contains_with_tolerance(&self, coords: &[f32; MAX_ND], rel_tol: f32) -> bool {
        for d in 0..self.nd {
            let slack = self.width(d) * rel_tol;
            if coords[d] < self.min[d] - slack || coords[d] > self.max[d] + slack {
                return false;
            }
        }
        return true;
    }

    /// Bounds of one cell of a uniform `split_into` grid over these extents.
    ///
    /// The last cell in each dimension takes the parent's exact upper bound so
    /// the children tile the parent with no floating-point gap.
    pub fn cell_sub_extents(&self, split_into: &[usize], cell: &[usize; MAX_ND]) -> MDExtents {
        let mut min = [0f32; MAX_ND];
        let mut max = [0f32; MAX_ND];

        for d in 0..self.nd {
            let cell_width = self.width(d) / split_into[d] as f32;
            min[d] = self.min[d] + cell[d] as f32 * cell_width;
            max[d] = match cell[d] + 1 == split_into[d] {
                true => self.max[d],
                false => self.min[d] + (cell[d] + 1) as f32 * cell_width,
            };
        }

        return Self {
            min,
            max,
            nd: self.nd,
        };
    }

    pub fn center(&self) -> [f32; MAX_ND] {
        let mut c = [0f32; MAX_ND];
        for d in 0..self.nd {
            c[d] = self.min[d] + self.width(d) / 2.0;
        }
        return c;
    }

    pub fn volume(&self) -> f64 {
        let mut v = 1.0f64;
        for d in 0..self.nd {
            v *= self.width(d) as f64;
        }
        return v;
    }
}

/// Spatial predicate over box extents, used to prune tree traversal. The tree
/// only ever asks whether a box's region can intersect the function's domain;
/// per-event filtering stays with the caller.
pub trait ImplicitFunction: Sync {
    fn intersects(&self, extents: &MDExtents) -> bool;
}

/// The simplest implicit function: an axis-aligned box region.
#[derive(Debug, Clone)]
pub struct AxisAlignedRegion {
    pub region: MDExtents,
}

impl AxisAlignedRegion {
    pub fn new(region: MDExtents) -> Self {
        return Self { region };
    }
}

impl ImplicitFunction for AxisAlignedRegion {
    fn intersects(&self, extents: &MDExtents) -> bool {
        for d in 0..self.region.nd.min(extents.nd) {
            if extents.min[d] >= self.region.max[d] || self.region.min[d] >= extents.max[d] {
                return false;
            }
        }
        return true;
    }
}
