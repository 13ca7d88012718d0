use ndarray::{
    Array1,
    Array2,
};

pub type Vector<T> = Array1<T>;  // Define this type to use broadcast operations.
pub type Matrix<T> = Array2<T>;
pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix
pub type Mat33<T> = [[T;3];3];   // 3x3 matrix


/// Crystal structure: cell vectors as rows of a 3x3 matrix, plus the atomic basis.
///
/// Only the cell is consulted by the k-point helpers (for the
/// reciprocal-lattice derived mesh spacing); the basis is carried along for
/// the calculation input generators.
#[derive(Clone, Debug)]
pub struct Structure {
    pub cell          : Mat33<f64>,
    pub ion_types     : Vec<String>,
    pub ions_per_type : Vec<i32>,
    pub frac_pos      : MatX3<f64>,
}

pub type Result<T> = anyhow::Result<T>;
