use roxmltree::{Document, Node, ParsingOptions};

use super::model::{
    HostAddress, Hostname, ReportHost, ReportPort, ScanInfo, ScanReport, ServiceDescriptor,
};
use crate::error::{Result, ScanError};

const ROOT_ELEMENT: &str = "nmaprun";
const DEFAULT_PROTOCOL: &str = "tcp";

/// Parses nmap's `-oX` output into a [`ScanReport`].
///
/// Fails with [`ScanError::MalformedReport`] when the document is not
/// well-formed XML, the root is not `<nmaprun>`, or a `<port>` carries a
/// `portid` outside 1..=65535.
pub fn parse_report(xml: &str) -> Result<ScanReport> {
    // nmap always emits `<!DOCTYPE nmaprun>`.
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options)
        .map_err(|err| ScanError::MalformedReport(format!("invalid XML: {err}")))?;

    let root = document.root_element();
    if !root.has_tag_name(ROOT_ELEMENT) {
        return Err(ScanError::MalformedReport(format!(
            "expected <{ROOT_ELEMENT}> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let scan_info = child(root, "scaninfo").map(parse_scan_info);
    let hosts = children(root, "host")
        .map(parse_host)
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanReport { scan_info, hosts })
}

fn parse_scan_info(node: Node<'_, '_>) -> ScanInfo {
    ScanInfo {
        scan_type: text_attr(node, "type"),
        protocol: text_attr(node, "protocol"),
        num_services: node
            .attribute("numservices")
            .and_then(|raw| raw.trim().parse().ok()),
    }
}

fn parse_host(node: Node<'_, '_>) -> Result<ReportHost> {
    let status = child(node, "status").and_then(|status| text_attr(status, "state"));

    let addresses: Vec<HostAddress> = children(node, "address")
        .filter_map(|address| {
            text_attr(address, "addr").map(|addr| HostAddress {
                addr,
                addr_type: text_attr(address, "addrtype"),
            })
        })
        .collect();

    let hostnames: Vec<Hostname> = child(node, "hostnames")
        .map(|list| {
            children(list, "hostname")
                .filter_map(|hostname| {
                    text_attr(hostname, "name").map(|name| Hostname {
                        name,
                        kind: text_attr(hostname, "type"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let ports = match child(node, "ports") {
        Some(list) => children(list, "port")
            .map(parse_port)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(ReportHost {
        status,
        addresses,
        hostnames,
        ports,
    })
}

fn parse_port(node: Node<'_, '_>) -> Result<ReportPort> {
    let raw_id = node
        .attribute("portid")
        .ok_or_else(|| ScanError::MalformedReport("<port> without portid".into()))?;
    let port = raw_id
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| ScanError::MalformedReport(format!("invalid portid {raw_id:?}")))?;

    let protocol = text_attr(node, "protocol").unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
    let state = child(node, "state").and_then(|state| text_attr(state, "state"));
    let service = child(node, "service").map(|service| ServiceDescriptor {
        name: text_attr(service, "name"),
        product: text_attr(service, "product"),
        version: text_attr(service, "version"),
        extra_info: text_attr(service, "extrainfo"),
    });

    Ok(ReportPort {
        port,
        protocol,
        state,
        service,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.has_tag_name(name))
}

fn text_attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
