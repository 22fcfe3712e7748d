pub mod error;
pub mod models;
pub mod validation;
pub mod user_info;
pub mod table;
pub mod ranking;
pub mod draw;

pub use error::{ErrorCode, ErrorResponse};
pub use models::*;
pub use validation::*;
pub use user_info::*;
pub use table::{Table, ColumnMissing};
pub use ranking::rank_members;
pub use draw::{draw, DrawError};
