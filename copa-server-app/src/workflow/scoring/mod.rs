pub mod recompute;
pub mod record_result;
