// Declares the adapter modules: the concrete implementations of the
// core crate's collaborator ports.

pub mod db;
pub mod presence;
pub mod realtime;
