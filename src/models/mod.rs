pub mod user;
pub mod analysis;
pub mod student_result;
pub mod industry_demand;

pub use user::*;
pub use analysis::*;
pub use student_result::*;
pub use industry_demand::*;

use mongodb::bson::DateTime as BsonDateTime;

/// RFC 3339 rendering used in API responses.
pub(crate) fn rfc3339(dt: &BsonDateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}
