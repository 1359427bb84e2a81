pub mod confirm;
pub mod reset;
