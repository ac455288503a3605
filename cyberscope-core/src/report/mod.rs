//! Scanner report normalization.
//!
//! Parsing happens in two stages: [`parse_report`] turns raw nmap XML into a
//! [`ScanReport`] tree, and [`project_findings`] flattens that tree into the
//! open-port drafts persisted as findings.

mod findings;
mod model;
mod nmap_xml;

pub use findings::{compose_version, project_findings};
pub use model::{
    HostAddress, Hostname, ReportHost, ReportPort, ScanInfo, ScanReport, ServiceDescriptor,
};
pub use nmap_xml::parse_report;
