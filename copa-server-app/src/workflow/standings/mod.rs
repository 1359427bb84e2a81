pub mod dashboard;
pub mod get;
pub mod mvp;
