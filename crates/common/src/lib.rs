// cowrite-common: shared types and wire protocol for the Cowrite workspace

pub mod protocol;
pub mod types;
