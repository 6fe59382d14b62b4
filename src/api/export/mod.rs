pub mod daily;
pub mod shape;
pub mod writer;
pub use daily::{DayReport, ExportJob, FailedRequest, RunReport};
pub use shape::{FilterContext, OutputRow};
pub use writer::DailyCsvWriter;
