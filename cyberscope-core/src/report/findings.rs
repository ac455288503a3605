use cyberscope_model::{NewFinding, Severity};

use super::model::{ReportPort, ScanReport, ServiceDescriptor};

/// Flattens a report into finding drafts, keeping only open ports.
///
/// Order follows the document: hosts in order, then ports within each host.
pub fn project_findings(report: &ScanReport) -> Vec<NewFinding> {
    report
        .hosts
        .iter()
        .flat_map(|host| host.ports.iter())
        .filter(|port| port.is_open())
        .map(draft_from_port)
        .collect()
}

fn draft_from_port(port: &ReportPort) -> NewFinding {
    let service = port.service.as_ref();
    NewFinding {
        port: port.port,
        protocol: port.protocol.clone(),
        state: "open".to_string(),
        service: service.and_then(|s| s.name.clone()),
        version: service.and_then(compose_version),
        severity: Severity::Info,
    }
}

/// Joins product and version with a single space.
///
/// Either part alone is returned as-is; `None` when both are blank.
pub fn compose_version(service: &ServiceDescriptor) -> Option<String> {
    let product = service.product.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let version = service.version.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (product, version) {
        (Some(product), Some(version)) => Some(format!("{product} {version}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}
