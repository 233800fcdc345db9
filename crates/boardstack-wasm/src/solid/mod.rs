//! Three-dimensional board model: extrusion, drilling, materials and merge.

pub mod drill;
pub mod extrude;
pub mod material;
pub mod merge;
pub mod mesh;

pub use drill::{DrillCounters, DrillPlan};
pub use extrude::{placement, DrillSolid, Solid};
pub use material::{Finish, FinishKind, FinishSet};
pub use merge::{merge, BoardMesh, MaterialRange};
pub use mesh::{Bounds3, Mesh};
