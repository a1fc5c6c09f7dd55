pub mod dialog;

pub use dialog::{ApiResponse, DialogData, DialogRequest, EvalOptions, EvalResult, ResponseMeta};
