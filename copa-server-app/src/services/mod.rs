pub mod deadline;
pub mod write_guard;
