use anyhow::bail;
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    errors::KpointError,
    types::{
        Matrix,
        Result,
        Structure,
        Vector,
    },
};


/// Relative tolerance for point-set comparisons, numpy `allclose` default.
pub const RTOL: f64 = 1e-5;
/// Absolute tolerance for point-set comparisons, numpy `allclose` default.
pub const ATOL: f64 = 1e-8;


/// Uniform N1 x N2 x N3 grid over [0,1) of the reciprocal cell, in
/// fractional coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct KpointMesh {
    pub mesh: [usize; 3],
    /// Fractional shift of the grid. Carried for completeness; every
    /// converter in this crate ignores it, matching kmesh.pl.
    pub offset: Option<[f64; 3]>,
}

/// Materialized list of k-points in fractional coordinates.
#[derive(Clone, Debug)]
pub struct ExplicitKpoints {
    /// N x 3 matrix, one fractional coordinate per row.
    pub kpoints: Matrix<f64>,
    /// Integration weights, parallel to `kpoints`. Sum to 1 when the list
    /// was expanded from a mesh.
    pub weights: Option<Vector<f64>>,
    /// High-symmetry labels as (row index, label) pairs in path order.
    /// Indices are unique; label strings may repeat ("W" vs "W_2").
    pub labels: Option<Vec<(usize, String)>>,
}

/// Either representation of Brillouin-zone sampling.
///
/// Replaces attribute-probing on a single dynamic container with an
/// exhaustive match at every consumer.
#[derive(Clone, Debug)]
pub enum Kpoints {
    Mesh(KpointMesh),
    Explicit(ExplicitKpoints),
}

impl From<KpointMesh> for Kpoints {
    fn from(mesh: KpointMesh) -> Self {
        Kpoints::Mesh(mesh)
    }
}

impl From<ExplicitKpoints> for Kpoints {
    fn from(klist: ExplicitKpoints) -> Self {
        Kpoints::Explicit(klist)
    }
}


/// Band path in the shape consumed by the Wannier90 input generator:
/// explicit `path` segments between labeled anchors, plus the fractional
/// coordinate of every anchor.
///
/// Serializes to exactly two fields, `path` and `point_coords`; the field
/// names and nesting are part of the wire contract with the
/// `kpoint_path` input of a Wannier90 calculation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KpointPath {
    pub path: Vec<(String, String)>,
    pub point_coords: IndexMap<String, [f64; 3]>,
}


/// Expand a k-point mesh into an explicit weighted list.
///
/// Works just like `kmesh.pl` of Wannier90: N1*N2*N3 points
/// `(x/N1, y/N2, z/N3)` enumerated with z fastest-varying, each carrying
/// weight `1/(N1*N2*N3)`. Downstream consumers rely on this exact order.
/// The mesh offset, if any, is discarded.
pub fn get_explicit_kpoints(kpts: &Kpoints) -> Result<ExplicitKpoints> {
    let kmesh = match kpts {
        Kpoints::Mesh(m) => m,
        Kpoints::Explicit(_) => bail!(KpointError::InvalidInput(
            "input does not contain a mesh".to_string()
        )),
    };

    let [n1, n2, n3] = kmesh.mesh;
    let totpts = n1 * n2 * n3;
    if totpts == 0 {
        bail!(KpointError::InvalidInput(format!(
            "mesh dimensions must be positive, got {}x{}x{}",
            n1, n2, n3
        )));
    }

    let weights = Vector::<f64>::from_elem(totpts, 1.0 / totpts as f64);

    let mut kpoints = Matrix::<f64>::zeros((totpts, 3));
    let mut ind = 0;
    for x in 0..n1 {
        for y in 0..n2 {
            for z in 0..n3 {
                kpoints[(ind, 0)] = x as f64 / n1 as f64;
                kpoints[(ind, 1)] = y as f64 / n2 as f64;
                kpoints[(ind, 2)] = z as f64 / n3 as f64;
                ind += 1;
            }
        }
    }

    Ok(ExplicitKpoints {
        kpoints,
        weights: Some(weights),
        labels: None,
    })
}


/// Build a k-point mesh dense enough that adjacent points in reciprocal
/// space are no further apart than `distance` (2pi/angstrom), without
/// forcing parity of the dimensions.
pub fn create_kpoints_from_distance(structure: &Structure, distance: f64) -> Result<KpointMesh> {
    if !distance.is_finite() || distance <= 0.0 {
        bail!(KpointError::InvalidInput(format!(
            "k-point spacing must be a positive number, got {}",
            distance
        )));
    }

    let mesh = structure.kmesh_from_spacing(distance);
    debug!(
        "spacing {:.4} 2pi/A -> {}x{}x{} mesh",
        distance, mesh[0], mesh[1], mesh[2]
    );

    Ok(KpointMesh { mesh, offset: None })
}


/// Explicit list of k-points with a given spacing; composition of
/// [`create_kpoints_from_distance`] and [`get_explicit_kpoints`].
pub fn get_explicit_kpoints_from_distance(
    structure: &Structure,
    distance: f64,
) -> Result<ExplicitKpoints> {
    let kmesh = create_kpoints_from_distance(structure, distance)?;
    get_explicit_kpoints(&Kpoints::Mesh(kmesh))
}


/// Cartesian product of K sequences: one row per combination, K columns,
/// the last input sequence varying fastest (row-major broadcast order).
pub fn cartesian_product<T: Copy>(arrays: &[Vector<T>]) -> Matrix<T> {
    let ncols = arrays.len();
    let nrows: usize = arrays.iter().map(|a| a.len()).product();

    let flat = arrays
        .iter()
        .map(|a| a.to_vec())
        .multi_cartesian_product()
        .flatten()
        .collect::<Vec<T>>();

    Matrix::from_shape_vec((nrows, ncols), flat).unwrap()
}


fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ATOL + RTOL * b.abs()
}

/// Order-insensitive comparison of two N x 3 point lists within
/// [`RTOL`]/[`ATOL`].
fn same_point_set(a: &Matrix<f64>, b: &Matrix<f64>) -> bool {
    if a.shape() != b.shape() {
        return false;
    }

    let mut used = vec![false; b.nrows()];
    'points: for ra in a.rows() {
        for (j, rb) in b.rows().into_iter().enumerate() {
            if !used[j] && ra.iter().zip(rb.iter()).all(|(x, y)| close(*x, *y)) {
                used[j] = true;
                continue 'points;
            }
        }
        return false;
    }
    true
}


/// Compress an explicit k-point list back into mesh dimensions.
///
/// Mesh-typed input returns its dimensions directly. Otherwise the sorted
/// unique values along each axis give candidate dimensions and a (min, max)
/// span; the candidate grid `linspace(min, max, n)` per axis, combined via
/// [`cartesian_product`], must reproduce the input as an unordered point
/// set or the list is rejected with a conversion error.
///
/// This detector is a heuristic: a mesh whose point count differs from the
/// product of its per-axis unique-value counts (e.g. an offset aliasing
/// values across axes) is falsely rejected, and a non-mesh list with the
/// right multiset of coordinates is falsely accepted. Downstream consumers
/// are tuned to exactly this behavior, so it is kept as is.
pub fn get_mesh_from_kpoints(kpts: &Kpoints) -> Result<[usize; 3]> {
    let klist = match kpts {
        Kpoints::Mesh(m) => return Ok(m.mesh),
        Kpoints::Explicit(k) => &k.kpoints,
    };

    if klist.nrows() == 0 {
        bail!(KpointError::Conversion(
            "cannot convert an empty k-point list to a mesh".to_string()
        ));
    }

    let mut mesh = [0usize; 3];
    let mut kmin = [0f64; 3];
    let mut kmax = [0f64; 3];
    // 3 directions
    for i in 0..3 {
        let mut uniq = klist.column(i).to_vec();
        uniq.sort_by(|a, b| a.partial_cmp(b).unwrap());
        uniq.dedup();
        kmin[i] = uniq[0];
        kmax[i] = uniq[uniq.len() - 1];
        mesh[i] = uniq.len();
    }

    let axes = (0..3)
        .map(|i| Vector::linspace(kmin[i], kmax[i], mesh[i]))
        .collect::<Vec<_>>();
    let klist_recovered = cartesian_product(&axes);

    if !same_point_set(klist, &klist_recovered) {
        bail!(KpointError::Conversion(format!(
            "cannot convert {} k-points to a {}x{}x{} mesh",
            klist.nrows(),
            mesh[0],
            mesh[1],
            mesh[2]
        )));
    }

    Ok(mesh)
}


/// Translate a labeled band path into the `kpoint_path` input of a
/// Wannier90 calculation.
///
/// Every labeled index contributes its coordinate to `point_coords` (last
/// write wins for a recurring label). Consecutive labels adjacent in the
/// explicit list describe a continuous stretch of the path and need no
/// segment entry; only jump discontinuities are emitted as
/// `(previous, current)` pairs.
pub fn get_path_from_kpoints(kpts: &ExplicitKpoints) -> Result<KpointPath> {
    let labels = match &kpts.labels {
        Some(l) if l.len() >= 2 => l,
        Some(l) => bail!(KpointError::InvalidInput(format!(
            "k-points must carry at least 2 labels, got {}",
            l.len()
        ))),
        None => bail!(KpointError::InvalidInput(
            "k-points must carry labels".to_string()
        )),
    };

    let nkpts = kpts.kpoints.nrows();
    let mut point_coords = IndexMap::new();
    for (idx, lab) in labels {
        if *idx >= nkpts {
            bail!(KpointError::InvalidInput(format!(
                "label '{}' points at index {} but the list has {} k-points",
                lab, idx, nkpts
            )));
        }
        let row = kpts.kpoints.row(*idx);
        point_coords.insert(lab.clone(), [row[0], row[1], row[2]]);
    }

    let mut path = Vec::new();
    let (mut prev_idx, mut prev_lab) = (labels[0].0, &labels[0].1);
    for (idx, lab) in &labels[1..] {
        if *idx != prev_idx + 1 {
            path.push((prev_lab.clone(), lab.clone()));
        }
        prev_idx = *idx;
        prev_lab = lab;
    }

    Ok(KpointPath { path, point_coords })
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_close_tolerances() {
        assert!(close(0.5, 0.5 + 1e-9));
        assert!(close(1.0, 1.0 + 5e-6));
        assert!(!close(0.5, 0.5 + 1e-3));
    }

    #[test]
    fn test_same_point_set_permuted() {
        let a = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]]);
        let b = arr2(&[[0.0, 0.5, 0.0], [0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]);
        assert!(same_point_set(&a, &b));
    }

    #[test]
    fn test_same_point_set_mismatch() {
        let a = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]);
        let b = arr2(&[[0.0, 0.0, 0.0], [0.25, 0.0, 0.0]]);
        assert!(!same_point_set(&a, &b));

        let short = arr2(&[[0.0, 0.0, 0.0]]);
        assert!(!same_point_set(&a, &short));
    }

    #[test]
    fn test_same_point_set_duplicates_need_multiplicity() {
        // A duplicated point must not match two distinct targets.
        let a = arr2(&[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        let b = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]);
        assert!(!same_point_set(&a, &b));
    }
}
