//! Field assembly: discretization capabilities and the assembler adapter.
//!
//! A discretization implements [`Discretization`] (state-dependent system)
//! and, for dynamic fields, [`MassForm`] (constant system). Flow
//! discretizations add [`ConvectiveDiscretization`]; mesh-motion models add
//! [`MeshGeometry`]. The [`AssemblerAdapter`] wraps one discretization and
//! implements [`SystemAssembler`], the capability the Newton solver drives.

mod adapter;
mod system;
mod traits;

pub use adapter::{AssemblerAdapter, SystemAssembler};
pub use system::AssembledSystem;
pub use traits::{
    ConvectiveDiscretization, ConvectiveLinearization, Discretization, FieldSampler, MassForm,
    MeshGeometry,
};
