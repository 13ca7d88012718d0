pub mod errors;
pub mod kpoints;
pub mod structure;
pub mod types;

pub use errors::KpointError;

pub use kpoints::{
    Kpoints,
    KpointMesh,
    KpointPath,
    ExplicitKpoints,
    get_explicit_kpoints,
    create_kpoints_from_distance,
    get_explicit_kpoints_from_distance,
    cartesian_product,
    get_mesh_from_kpoints,
    get_path_from_kpoints,
};

pub use types::{
    Mat33,
    MatX3,
    Matrix,
    Result,
    Structure,
    Vector,
};
