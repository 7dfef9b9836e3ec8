pub mod app;

pub use app::{fatal_error_report, publish_fatal_error, report_fatal_error, MonitorApp};
