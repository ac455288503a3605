use serde::Serialize;

/// Intermediate tree built from one scanner report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub scan_info: Option<ScanInfo>,
    pub hosts: Vec<ReportHost>,
}

impl ScanReport {
    pub fn port_count(&self) -> usize {
        self.hosts.iter().map(|host| host.ports.len()).sum()
    }
}

/// Contents of the `<scaninfo>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanInfo {
    pub scan_type: Option<String>,
    pub protocol: Option<String>,
    pub num_services: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportHost {
    pub status: Option<String>,
    pub addresses: Vec<HostAddress>,
    pub hostnames: Vec<Hostname>,
    pub ports: Vec<ReportPort>,
}

impl ReportHost {
    pub fn is_up(&self) -> bool {
        self.status.as_deref() == Some("up")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostAddress {
    pub addr: String,
    pub addr_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hostname {
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPort {
    pub port: u16,
    pub protocol: String,
    pub state: Option<String>,
    pub service: Option<ServiceDescriptor>,
}

impl ReportPort {
    pub fn is_open(&self) -> bool {
        self.state.as_deref() == Some("open")
    }
}

/// Attributes of a `<service>` element. Blank attributes are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub name: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub extra_info: Option<String>,
}
