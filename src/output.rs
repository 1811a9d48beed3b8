use crate::config::ScanConfig;
use crate::types::{OpenPort, ScanReport, ScanTarget};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::Path;

/// Banners longer than this are cut in the results table.
const BANNER_SNIPPET: usize = 60;

/// Streaming line printed the moment an open port is found.
pub fn format_discovery(found: &OpenPort) -> String {
    match &found.banner {
        Some(b) => format!("[+] {} open - Banner: {}", found.port, b),
        None => format!("[+] {} open", found.port),
    }
}

pub fn print_header(host: &str, target: &ScanTarget, config: &ScanConfig) {
    println!();
    println!("Scanning ports on: {} ({})", host, target.address);
    println!(
        "Range: {}  Timeout: {:?}  Banner timeout: {:?}  Workers: {}  Banner: {}",
        target.range,
        config.connect_timeout,
        config.banner_timeout,
        config.workers,
        config.capture_banner
    );
    println!();
}

pub fn format_summary(report: &ScanReport) -> String {
    let verb = if report.cancelled {
        "Scan interrupted after"
    } else {
        "Scan completed in"
    };
    format!(
        "{} {:.2?}. Open ports: {} (scanned: {}/{})",
        verb,
        report.elapsed,
        report.open_count(),
        report.scanned,
        report.total
    )
}

/// Print open ports sorted by port number as an aligned table.
pub fn print_results_table(report: &ScanReport) {
    if let Some(table) = format_results_table(report) {
        println!("\n{table}");
    }
}

/// Aligned table of open ports; `None` when nothing is open.
pub fn format_results_table(report: &ScanReport) -> Option<String> {
    let rows = report.open_ports_sorted();
    if rows.is_empty() {
        return None;
    }
    let mut port_w = "port".len();
    let mut banner_w = "banner".len();
    for r in &rows {
        port_w = port_w.max(r.port.to_string().len());
        if let Some(b) = &r.banner {
            banner_w = banner_w.max(b.chars().count().min(BANNER_SNIPPET));
        }
    }

    let mut lines = vec![
        format!(
            "{:>port_w$}  {:<banner_w$}  {}",
            "port", "banner", "discovered_at"
        ),
        format!("{:-<port_w$}  {:-<banner_w$}  {:-<20}", "", "", ""),
    ];
    for r in &rows {
        let snippet = banner_snippet(r.banner.as_deref().unwrap_or_default());
        lines.push(format!(
            "{:>port_w$}  {:<banner_w$}  {}",
            r.port, snippet, r.discovered_at
        ));
    }
    Some(lines.join("\n"))
}

/// Single-line, width-limited banner for tables.
fn banner_snippet(banner: &str) -> String {
    let flat = banner.replace('\n', "\\n").replace('\r', "\\r");
    flat.chars().take(BANNER_SNIPPET).collect()
}

/// `<address>:<port>[ - <banner>]`; IPv6 addresses are bracketed.
pub fn persist_line(report: &ScanReport, found: &OpenPort) -> String {
    let addr = SocketAddr::new(report.address, found.port);
    match &found.banner {
        Some(b) => format!("{addr} - {b}"),
        None => addr.to_string(),
    }
}

/// Append one line per open port (sorted by port) to `path`, creating it if needed.
/// Returns the number of lines written; nothing is touched when no ports are open.
pub fn append_open_ports(path: &Path, report: &ScanReport) -> Result<usize> {
    if report.open.is_empty() {
        return Ok(0);
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let rows = report.open_ports_sorted();
    for found in &rows {
        writeln!(w, "{}", persist_line(report, found))
            .with_context(|| format!("failed to write to {}", path.display()))?;
    }
    w.flush()?;
    Ok(rows.len())
}

pub fn write_report_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create JSON file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortRange;
    use std::net::{IpAddr, Ipv6Addr};

    fn found(port: u16, banner: Option<&str>) -> OpenPort {
        OpenPort {
            port,
            banner: banner.map(str::to_string),
            discovered_at: String::new(),
        }
    }

    #[test]
    fn discovery_lines() {
        assert_eq!(format_discovery(&found(22, None)), "[+] 22 open");
        assert_eq!(
            format_discovery(&found(21, Some("220 ftp"))),
            "[+] 21 open - Banner: 220 ftp"
        );
    }

    #[test]
    fn ipv6_persist_line_is_bracketed() {
        let target = ScanTarget::new(IpAddr::V6(Ipv6Addr::LOCALHOST), PortRange::default());
        let report = ScanReport::new(&target, String::new());
        assert_eq!(persist_line(&report, &found(80, None)), "[::1]:80");
    }

    #[test]
    fn snippet_flattens_and_truncates() {
        let long = "x".repeat(100);
        assert_eq!(banner_snippet(&long).len(), BANNER_SNIPPET);
        assert_eq!(banner_snippet("a\r\nb"), "a\\r\\nb");
    }

    #[test]
    fn table_port_column_fits_widest_port() {
        let target = ScanTarget::new(IpAddr::V6(Ipv6Addr::LOCALHOST), PortRange::default());
        let mut report = ScanReport::new(&target, String::new());
        assert!(format_results_table(&report).is_none());

        report.open.push(found(65535, Some("hi")));
        report.open.push(found(22, None));
        let table = format_results_table(&report).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(" port  banner"));
        assert!(lines[1].starts_with("-----  ------"));
        assert!(lines[2].starts_with("   22  "));
        assert!(lines[3].starts_with("65535  hi"));
    }
}
