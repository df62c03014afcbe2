//! Voxelized material geometry.
//!
//! A [`VoxelGrid`] is a dense 3D array of material ids with physical spacing
//! and an origin offset. Point lookups outside the grid return `None` —
//! "escaped" is a first-class terminal condition, not an error. The grid
//! also accumulates per-voxel energy deposition (dose) merged in from worker
//! buffers at run end.

use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// JSON description of a voxel volume: dims, spacing, origin, and the
/// flattened material-id array in x-fastest order. Producing this file from
/// an image/volume format is an external collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDescription {
    pub dims: [usize; 3],
    /// Voxel edge lengths in cm.
    pub spacing: [f64; 3],
    /// Position of the grid's minimum corner in cm.
    pub origin: [f64; 3],
    pub material_ids: Vec<u8>,
}

/// Dense voxel grid with spacing and origin.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    dims: [usize; 3],
    spacing: Vector3<f64>,
    origin: Vector3<f64>,
    materials: Vec<u8>,
    dose: Vec<f64>,
}

impl VoxelGrid {
    pub fn new(
        dims: [usize; 3],
        spacing: Vector3<f64>,
        origin: Vector3<f64>,
        materials: Vec<u8>,
    ) -> Result<Self> {
        let n = dims[0] * dims[1] * dims[2];
        if n == 0 {
            return Err(TransportError::Configuration(
                "voxel grid has zero extent".to_string(),
            ));
        }
        if materials.len() != n {
            return Err(TransportError::Configuration(format!(
                "voxel grid dims {:?} imply {} voxels but {} material ids given",
                dims,
                n,
                materials.len()
            )));
        }
        if spacing.iter().any(|&s| s <= 0.0) {
            return Err(TransportError::Configuration(format!(
                "voxel spacing must be positive, got {:?}",
                spacing
            )));
        }
        Ok(Self {
            dims,
            spacing,
            origin,
            materials,
            dose: vec![0.0; n],
        })
    }

    /// Grid filled with a single material, spanning `extent` cm from
    /// `origin`.
    pub fn homogeneous(
        dims: [usize; 3],
        spacing: Vector3<f64>,
        origin: Vector3<f64>,
        material_id: u8,
    ) -> Result<Self> {
        let n = dims[0] * dims[1] * dims[2];
        Self::new(dims, spacing, origin, vec![material_id; n])
    }

    pub fn from_description(description: &VolumeDescription) -> Result<Self> {
        Self::new(
            description.dims,
            Vector3::from(description.spacing),
            Vector3::from(description.origin),
            description.material_ids.clone(),
        )
    }

    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let description: VolumeDescription = serde_json::from_str(&text)?;
        Self::from_description(&description)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spacing(&self) -> Vector3<f64> {
        self.spacing
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn num_voxels(&self) -> usize {
        self.materials.len()
    }

    /// Physical size of the grid in cm.
    pub fn extent(&self) -> Vector3<f64> {
        Vector3::new(
            self.dims[0] as f64 * self.spacing.x,
            self.dims[1] as f64 * self.spacing.y,
            self.dims[2] as f64 * self.spacing.z,
        )
    }

    /// Half-open containment test: a point exactly on the maximum face is
    /// outside, so shared faces belong to exactly one voxel.
    pub fn contains(&self, position: &Vector3<f64>) -> bool {
        let local = position - self.origin;
        let extent = self.extent();
        (0..3).all(|axis| local[axis] >= 0.0 && local[axis] < extent[axis])
    }

    /// Voxel index of a position, or `None` if outside the grid.
    pub fn voxel_index(&self, position: &Vector3<f64>) -> Option<[usize; 3]> {
        if !self.contains(position) {
            return None;
        }
        let local = position - self.origin;
        let mut index = [0usize; 3];
        for axis in 0..3 {
            let i = (local[axis] / self.spacing[axis]).floor() as isize;
            // floor can land on dims[axis] for points within float eps of the face
            index[axis] = i.clamp(0, self.dims[axis] as isize - 1) as usize;
        }
        Some(index)
    }

    fn linear_index(&self, index: [usize; 3]) -> usize {
        index[0] + index[1] * self.dims[0] + index[2] * self.dims[0] * self.dims[1]
    }

    /// Material id at a position; `None` means the point escaped the grid.
    pub fn material_at(&self, position: &Vector3<f64>) -> Option<u8> {
        self.voxel_index(position)
            .map(|index| self.materials[self.linear_index(index)])
    }

    /// Distance along `direction` from `position` (inside the grid) to the
    /// next voxel-face crossing, and the material entered there (`None` when
    /// the ray leaves the grid).
    ///
    /// Face coordinates are reconstructed from integer voxel indices, not
    /// accumulated, so repeated traversal steps do not drift.
    pub fn distance_to_boundary(
        &self,
        position: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> (f64, Option<u8>) {
        let Some(index) = self.voxel_index(position) else {
            return (0.0, None);
        };

        let mut best_t = f64::INFINITY;
        let mut best_axis = None;
        for axis in 0..3 {
            let d = direction[axis];
            if d.abs() < 1e-12 {
                continue;
            }
            let face_index = if d > 0.0 {
                index[axis] as f64 + 1.0
            } else {
                index[axis] as f64
            };
            let face = self.origin[axis] + face_index * self.spacing[axis];
            let t = (face - position[axis]) / d;
            if t < best_t {
                best_t = t;
                best_axis = Some(axis);
            }
        }

        let Some(axis) = best_axis else {
            // direction numerically zero on every axis
            return (f64::INFINITY, None);
        };
        let t = best_t.max(0.0);

        let mut next = [index[0] as isize, index[1] as isize, index[2] as isize];
        next[axis] += if direction[axis] > 0.0 { 1 } else { -1 };
        let inside =
            (0..3).all(|a| next[a] >= 0 && next[a] < self.dims[a] as isize);
        let next_material = inside.then(|| {
            self.materials[self.linear_index([next[0] as usize, next[1] as usize, next[2] as usize])]
        });
        (t, next_material)
    }

    /// Adds deposited energy (eV) to the voxel containing `position`.
    /// Out-of-grid positions are ignored.
    pub fn add_dose_at(&mut self, position: &Vector3<f64>, energy: f64) {
        if let Some(index) = self.voxel_index(position) {
            let i = self.linear_index(index);
            self.dose[i] += energy;
        }
    }

    /// Merges a worker-local dose buffer (same voxel count) into the grid.
    pub fn merge_dose(&mut self, buffer: &[f64]) {
        debug_assert_eq!(buffer.len(), self.dose.len());
        for (acc, &value) in self.dose.iter_mut().zip(buffer.iter()) {
            *acc += value;
        }
    }

    /// Linear voxel index of a position, for worker-local dose buffers.
    pub fn dose_index(&self, position: &Vector3<f64>) -> Option<usize> {
        self.voxel_index(position).map(|i| self.linear_index(i))
    }

    pub fn total_energy_deposited(&self) -> f64 {
        self.dose.iter().sum()
    }

    /// Deposited energy grouped by material id.
    pub fn energy_deposited_by_material(&self) -> HashMap<u8, f64> {
        let mut per_material = HashMap::new();
        for (&id, &dose) in self.materials.iter().zip(self.dose.iter()) {
            *per_material.entry(id).or_insert(0.0) += dose;
        }
        per_material
    }

    /// Unique material ids present in the grid, for pre-run validation.
    pub fn material_ids_in_use(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.materials.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Clears accumulated dose; called at simulation start.
    pub fn reset_dose(&mut self) {
        self.dose.iter_mut().for_each(|d| *d = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_2x2x2() -> VoxelGrid {
        // 2x2x2 voxels of 1 cm, origin at 0
        VoxelGrid::homogeneous(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::zeros(),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_dims_material_count_mismatch() {
        let result = VoxelGrid::new(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::zeros(),
            vec![1; 7],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_contains_half_open() {
        let grid = grid_2x2x2();
        assert!(grid.contains(&Vector3::new(0.0, 0.0, 0.0)));
        assert!(grid.contains(&Vector3::new(1.999, 1.999, 1.999)));
        // max faces are outside
        assert!(!grid.contains(&Vector3::new(2.0, 1.0, 1.0)));
        assert!(!grid.contains(&Vector3::new(1.0, 1.0, 2.0)));
        assert!(!grid.contains(&Vector3::new(-0.001, 1.0, 1.0)));
    }

    #[test]
    fn test_material_at_and_escape() {
        let mut ids = vec![0u8; 8];
        ids[0] = 7; // voxel (0,0,0)
        let grid = VoxelGrid::new(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::zeros(),
            ids,
        )
        .unwrap();
        assert_eq!(grid.material_at(&Vector3::new(0.5, 0.5, 0.5)), Some(7));
        assert_eq!(grid.material_at(&Vector3::new(1.5, 0.5, 0.5)), Some(0));
        assert_eq!(grid.material_at(&Vector3::new(3.0, 0.5, 0.5)), None);
    }

    #[test]
    fn test_point_on_shared_face_belongs_to_one_voxel() {
        let grid = grid_2x2x2();
        // x = 1.0 is the face between voxels 0 and 1: half-open puts it in voxel 1
        let index = grid.voxel_index(&Vector3::new(1.0, 0.5, 0.5)).unwrap();
        assert_eq!(index, [1, 0, 0]);
    }

    #[test]
    fn test_origin_offset() {
        let grid = VoxelGrid::homogeneous(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(-1.0, -1.0, 0.0),
            3,
        )
        .unwrap();
        assert_eq!(grid.material_at(&Vector3::new(-0.5, -0.5, 0.5)), Some(3));
        assert_eq!(grid.material_at(&Vector3::new(1.5, 0.5, 0.5)), None);
    }

    #[test]
    fn test_distance_to_boundary_axis_aligned() {
        let grid = grid_2x2x2();
        let (t, next) = grid.distance_to_boundary(
            &Vector3::new(0.25, 0.5, 0.5),
            &Vector3::new(1.0, 0.0, 0.0),
        );
        assert_relative_eq!(t, 0.75, epsilon = 1e-12);
        assert_eq!(next, Some(1));
        // leaving the grid
        let (t, next) = grid.distance_to_boundary(
            &Vector3::new(1.5, 0.5, 0.5),
            &Vector3::new(1.0, 0.0, 0.0),
        );
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        assert_eq!(next, None);
    }

    #[test]
    fn test_distance_to_boundary_diagonal() {
        let grid = grid_2x2x2();
        let direction = Vector3::new(1.0, 1.0, 0.0).normalize();
        let (t, _) = grid.distance_to_boundary(&Vector3::new(0.5, 0.75, 0.5), &direction);
        // y face at 1.0 is closer: 0.25 / (1/sqrt(2))
        assert_relative_eq!(t, 0.25 * 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_traversal_accumulates_exact_face_positions() {
        // march across 100 voxels; face distances come from indices, so the
        // summed path equals the grid extent exactly up to one ulp per step
        let grid = VoxelGrid::homogeneous(
            [100, 1, 1],
            Vector3::new(0.1, 1.0, 1.0),
            Vector3::zeros(),
            1,
        )
        .unwrap();
        let direction = Vector3::new(1.0, 0.0, 0.0);
        let mut position = Vector3::new(0.05, 0.5, 0.5);
        let mut total = 0.05;
        loop {
            let (t, next) = grid.distance_to_boundary(&position, &direction);
            total += t;
            position += (t + 1e-9) * direction;
            if next.is_none() {
                break;
            }
        }
        assert_relative_eq!(total, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dose_accumulation_and_reports() {
        let mut ids = vec![1u8; 8];
        ids[7] = 2;
        let mut grid = VoxelGrid::new(
            [2, 2, 2],
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::zeros(),
            ids,
        )
        .unwrap();
        grid.add_dose_at(&Vector3::new(0.5, 0.5, 0.5), 100.0);
        grid.add_dose_at(&Vector3::new(1.5, 1.5, 1.5), 50.0);
        grid.add_dose_at(&Vector3::new(9.0, 0.0, 0.0), 1e9); // ignored
        assert_relative_eq!(grid.total_energy_deposited(), 150.0);
        let per_material = grid.energy_deposited_by_material();
        assert_relative_eq!(per_material[&1], 100.0);
        assert_relative_eq!(per_material[&2], 50.0);
        grid.reset_dose();
        assert_relative_eq!(grid.total_energy_deposited(), 0.0);
    }

    #[test]
    fn test_merge_dose_buffers() {
        let mut grid = grid_2x2x2();
        let mut buffer_a = vec![0.0; 8];
        let mut buffer_b = vec![0.0; 8];
        buffer_a[0] = 10.0;
        buffer_b[0] = 5.0;
        buffer_b[3] = 2.0;
        grid.merge_dose(&buffer_a);
        grid.merge_dose(&buffer_b);
        assert_relative_eq!(grid.total_energy_deposited(), 17.0);
    }

    #[test]
    fn test_description_round_trip() {
        let description = VolumeDescription {
            dims: [1, 1, 2],
            spacing: [0.5, 0.5, 0.5],
            origin: [0.0, 0.0, 0.0],
            material_ids: vec![1, 2],
        };
        let grid = VoxelGrid::from_description(&description).unwrap();
        assert_eq!(grid.material_at(&Vector3::new(0.25, 0.25, 0.75)), Some(2));
        assert_eq!(grid.material_ids_in_use(), vec![1, 2]);
    }
}
