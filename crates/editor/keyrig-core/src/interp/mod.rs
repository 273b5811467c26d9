//! Interpolation and rotation helpers.
//!
//! Positions blend linearly; rotations use shortest-arc slerp. Euler conversions follow the
//! intrinsic XYZ convention the transform panel edits in.

pub mod functions;
