use cyberscope_core::{
    ScanError, parse_report, project_findings,
    model::Severity,
};

const THREE_OPEN_PORTS: &str = include_str!("fixtures/three_open_ports.xml");

#[test]
fn fixture_yields_three_open_findings_in_document_order() {
    assert!(THREE_OPEN_PORTS.contains("<!DOCTYPE nmaprun>"));
    let report = parse_report(THREE_OPEN_PORTS).unwrap();
    assert_eq!(report.port_count(), 4);

    let findings = project_findings(&report);
    let summary: Vec<(u16, &str, Option<&str>, Option<&str>)> = findings
        .iter()
        .map(|f| (f.port, f.protocol.as_str(), f.service.as_deref(), f.version.as_deref()))
        .collect();

    assert_eq!(
        summary,
        vec![
            (22, "tcp", Some("ssh"), Some("OpenSSH 8.9p1 Ubuntu 3ubuntu0.6")),
            (80, "tcp", Some("http"), Some("nginx 1.18.0")),
            (443, "tcp", Some("https"), Some("nginx")),
        ]
    );
    assert!(findings.iter().all(|f| f.state == "open" && f.severity == Severity::Info));
}

#[test]
fn product_only_service_keeps_product_as_version() {
    let xml = r#"<nmaprun>
  <host>
    <ports>
      <port protocol="tcp" portid="3306">
        <state state="open"/>
        <service name="mysql" product="MySQL" version="   "/>
      </port>
    </ports>
  </host>
</nmaprun>"#;
    let findings = project_findings(&parse_report(xml).unwrap());
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].version.as_deref(), Some("MySQL"));
}

#[test]
fn port_without_service_has_no_service_or_version() {
    let xml = r#"<nmaprun><host><ports>
      <port protocol="tcp" portid="9999"><state state="open"/></port>
    </ports></host></nmaprun>"#;
    let findings = project_findings(&parse_report(xml).unwrap());
    assert_eq!(findings[0].service, None);
    assert_eq!(findings[0].version, None);
}

#[test]
fn malformed_inputs_are_reported() {
    for xml in [
        "",
        "not xml at all",
        "<nmaprun>",
        "<report></report>",
        r#"<nmaprun><host><ports><port portid="abc"/></ports></host></nmaprun>"#,
    ] {
        assert!(
            matches!(parse_report(xml), Err(ScanError::MalformedReport(_))),
            "{xml:?}"
        );
    }
}
