use std::f64::consts::PI;

use crate::types::{
    Mat33,
    Structure,
};


fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}


fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}


impl Structure {
    /// Cell volume, signed by the handedness of the lattice vectors.
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.cell;
        let bxc = cross(b, c);
        a[0] * bxc[0] + a[1] * bxc[1] + a[2] * bxc[2]
    }

    /// Reciprocal cell with the 2pi convention, rows are b1, b2, b3.
    ///
    /// b1 = 2pi (a2 x a3) / V  and cyclic permutations, so that
    /// a_i . b_j = 2pi delta_ij.
    pub fn reciprocal_cell(&self) -> Mat33<f64> {
        let [a, b, c] = self.cell;
        let fac = 2.0 * PI / self.volume();

        let bxc = cross(b, c);
        let cxa = cross(c, a);
        let axb = cross(a, b);

        [
            [fac * bxc[0], fac * bxc[1], fac * bxc[2]],
            [fac * cxa[0], fac * cxa[1], fac * cxa[2]],
            [fac * axb[0], fac * axb[1], fac * axb[2]],
        ]
    }

    /// Mesh dimensions guaranteeing adjacent mesh points are no further
    /// apart than `spacing` (in the same reciprocal units as the cell,
    /// i.e. 2pi/angstrom for a cell in angstrom).
    ///
    /// The ratio is rounded to 5 decimals before taking the ceiling so a
    /// spacing that divides |b_i| exactly up to floating noise does not
    /// bump the dimension by one. No parity is forced on the result.
    pub fn kmesh_from_spacing(&self, spacing: f64) -> [usize; 3] {
        let rec_cell = self.reciprocal_cell();

        let mut mesh = [1usize; 3];
        for (n, b) in mesh.iter_mut().zip(rec_cell.iter()) {
            let ratio = (norm(*b) / spacing * 1e5).round() / 1e5;
            *n = (ratio.ceil() as usize).max(1);
        }
        mesh
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cubic(a: f64) -> Structure {
        Structure {
            cell: [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]],
            ion_types: vec!["Si".to_string()],
            ions_per_type: vec![1],
            frac_pos: vec![[0.0, 0.0, 0.0]],
        }
    }

    #[test]
    fn test_volume() {
        assert_abs_diff_eq!(cubic(2.0).volume(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reciprocal_cell_cubic() {
        let rec = cubic(2.0).reciprocal_cell();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { PI } else { 0.0 };
                assert_abs_diff_eq!(rec[i][j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_reciprocal_cell_triclinic_duality() {
        let s = Structure {
            cell: [[3.0, 0.1, 0.0], [-1.5, 2.6, 0.0], [0.2, 0.0, 5.0]],
            ion_types: vec![],
            ions_per_type: vec![],
            frac_pos: vec![],
        };
        let rec = s.reciprocal_cell();
        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = (0..3).map(|k| s.cell[i][k] * rec[j][k]).sum();
                let expected = if i == j { 2.0 * PI } else { 0.0 };
                assert_abs_diff_eq!(dot, expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_kmesh_from_spacing() {
        // |b_i| = pi for a = 2.0, so spacing pi/4 needs 4 subdivisions.
        let s = cubic(2.0);
        assert_eq!(s.kmesh_from_spacing(PI / 4.0), [4, 4, 4]);
        // A spacing coarser than |b_i| still yields at least one point.
        assert_eq!(s.kmesh_from_spacing(100.0), [1, 1, 1]);
    }

    #[test]
    fn test_kmesh_from_spacing_exact_ratio() {
        // The exact-divisor case must not round up to 5 due to fp noise.
        let s = cubic(2.0);
        assert_eq!(s.kmesh_from_spacing(PI / 4.0 * (1.0 + 1e-9)), [4, 4, 4]);
    }
}
