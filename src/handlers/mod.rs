//! Directive handlers that are not routed to a single control
//!
//! Discovery and grants are endpoint-less. State reports and change reports
//! wrap a [`Device`](crate::device::Device) snapshot in the matching envelope.

mod authorization;
mod change_report;
mod discovery;
mod report_state;

pub use authorization::accept_grant;
pub use change_report::{PendingChange, change_report, pending_change};
pub use discovery::discover;
pub use report_state::report_state;
