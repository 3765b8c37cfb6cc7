pub mod queries;
pub mod routes;

pub use queries::{
    AboveMeanError, AboveMeanQuery, AboveMeanResponse, DepartmentHires, HiredByQuarterError,
    HiredByQuarterQuery, HiredByQuarterResponse, QuarterRow,
};

pub use routes::reports_routes;
