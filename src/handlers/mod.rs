// Handlers module

pub mod get_result;
pub mod status;

pub use get_result::get_result_handler;
pub use status::status_handler;
