pub mod delete;
pub mod list;
pub mod manage;
pub mod register;
