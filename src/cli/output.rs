//! Output formatting for packet summaries.
//!
//! One row per packet, written as a table, CSV, or JSON Lines.

use std::io::Write;

use clap::ValueEnum;

use crate::api::PacketSummary;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table (default)
    Table,
    /// Comma-separated values
    Csv,
    /// JSON Lines (one JSON object per row)
    Json,
}

/// One output row: a packet's summary and, optionally, its layer stack.
#[derive(Debug, Clone)]
pub struct PacketRow {
    pub frame: u64,
    pub summary: PacketSummary,
    /// Layer names root to leaf, e.g. `"ipv4/tcp/tls"`.
    pub layers: Option<String>,
}

const COLUMNS: [&str; 8] = [
    "frame",
    "src",
    "dst",
    "protocol",
    "sport",
    "dport",
    "server_name",
    "source",
];

/// Formats packet rows for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format rows and write to the given writer.
    pub fn write<W: Write>(&self, rows: &[PacketRow], writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table(rows, writer),
            OutputFormat::Csv => self.write_csv(rows, writer),
            OutputFormat::Json => self.write_json(rows, writer),
        }
    }

    fn with_layers(rows: &[PacketRow]) -> bool {
        rows.iter().any(|row| row.layers.is_some())
    }

    /// Cell values in column order, ports left empty without a transport layer.
    fn values(row: &PacketRow) -> Vec<String> {
        let summary = &row.summary;
        let port = |p: u16| {
            if p == 0 && summary.protocol == "Unknown" {
                String::new()
            } else {
                p.to_string()
            }
        };

        vec![
            row.frame.to_string(),
            summary.src_addr.clone(),
            summary.dst_addr.clone(),
            summary.protocol.to_string(),
            port(summary.src_port),
            port(summary.dst_port),
            summary.server_name.clone(),
            summary.name_source.to_string(),
        ]
    }

    fn write_table<W: Write>(&self, rows: &[PacketRow], writer: &mut W) -> std::io::Result<()> {
        use comfy_table::{Cell, Table};

        let with_layers = Self::with_layers(rows);
        let mut table = Table::new();

        let mut headers: Vec<Cell> = COLUMNS.iter().map(|name| Cell::new(name)).collect();
        if with_layers {
            headers.push(Cell::new("layers"));
        }
        table.set_header(headers);

        for row in rows {
            let mut cells: Vec<Cell> = Self::values(row).into_iter().map(Cell::new).collect();
            if with_layers {
                cells.push(Cell::new(row.layers.as_deref().unwrap_or_default()));
            }
            table.add_row(cells);
        }

        writeln!(writer, "{table}")
    }

    fn write_csv<W: Write>(&self, rows: &[PacketRow], writer: &mut W) -> std::io::Result<()> {
        let with_layers = Self::with_layers(rows);

        // Write header
        let mut headers = COLUMNS.to_vec();
        if with_layers {
            headers.push("layers");
        }
        writeln!(writer, "{}", headers.join(","))?;

        // Write rows
        for row in rows {
            let mut values = Self::values(row);
            if with_layers {
                values.push(row.layers.clone().unwrap_or_default());
            }
            let escaped: Vec<String> = values.into_iter().map(escape_csv).collect();
            writeln!(writer, "{}", escaped.join(","))?;
        }

        Ok(())
    }

    fn write_json<W: Write>(&self, rows: &[PacketRow], writer: &mut W) -> std::io::Result<()> {
        for row in rows {
            let summary = &row.summary;
            let port = |p: u16| {
                if summary.protocol == "Unknown" {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::Number(p.into())
                }
            };
            let text = |s: &str| {
                if s.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(s.to_string())
                }
            };

            let mut obj = serde_json::Map::new();
            obj.insert("frame".to_string(), row.frame.into());
            obj.insert("src".to_string(), text(summary.src_addr.as_str()));
            obj.insert("dst".to_string(), text(summary.dst_addr.as_str()));
            obj.insert("protocol".to_string(), summary.protocol.into());
            obj.insert("sport".to_string(), port(summary.src_port));
            obj.insert("dport".to_string(), port(summary.dst_port));
            obj.insert("server_name".to_string(), text(summary.server_name.as_str()));
            obj.insert("source".to_string(), text(summary.name_source));
            if let Some(layers) = &row.layers {
                obj.insert("layers".to_string(), layers.as_str().into());
            }

            writeln!(writer, "{}", serde_json::Value::Object(obj))?;
        }

        Ok(())
    }
}

/// Quote a CSV value containing commas, quotes or newlines.
fn escape_csv(value: String) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_rows() -> Vec<PacketRow> {
        vec![
            PacketRow {
                frame: 1,
                summary: PacketSummary {
                    src_addr: "192.168.1.1".to_string(),
                    dst_addr: "93.184.216.34".to_string(),
                    src_port: 51000,
                    dst_port: 443,
                    protocol: "TCP",
                    server_name: "example.com".to_string(),
                    name_source: "sni",
                },
                layers: None,
            },
            PacketRow {
                frame: 2,
                summary: PacketSummary {
                    src_addr: "10.0.0.1".to_string(),
                    dst_addr: "10.0.0.2".to_string(),
                    protocol: "Unknown",
                    ..PacketSummary::default()
                },
                layers: None,
            },
        ]
    }

    fn render(format: OutputFormat, rows: &[PacketRow]) -> String {
        let mut output = Vec::new();
        OutputFormatter::new(format).write(rows, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_table_output() {
        let output = render(OutputFormat::Table, &create_test_rows());

        assert!(output.contains("server_name"));
        assert!(output.contains("192.168.1.1"));
        assert!(output.contains("example.com"));
        assert!(output.contains("Unknown"));
        assert!(!output.contains("layers"));
    }

    #[test]
    fn test_csv_output() {
        let output = render(OutputFormat::Csv, &create_test_rows());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "frame,src,dst,protocol,sport,dport,server_name,source");
        assert_eq!(lines[1], "1,192.168.1.1,93.184.216.34,TCP,51000,443,example.com,sni");
        assert_eq!(lines[2], "2,10.0.0.1,10.0.0.2,Unknown,,,,");
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("plain".to_string()), "plain");
        assert_eq!(escape_csv("a,b".to_string()), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\"".to_string()), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_json_output() {
        let output = render(OutputFormat::Json, &create_test_rows());
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["server_name"], "example.com");
        assert_eq!(lines[0]["dport"], 443);
        assert_eq!(lines[0]["source"], "sni");
        assert!(lines[1]["sport"].is_null());
        assert!(lines[1]["server_name"].is_null());
        assert!(lines[1].get("layers").is_none());
    }

    #[test]
    fn test_layers_column() {
        let mut rows = create_test_rows();
        rows[0].layers = Some("ipv4/tcp/tls".to_string());

        let csv = render(OutputFormat::Csv, &rows);
        assert!(csv.lines().next().unwrap().ends_with(",layers"));
        assert!(csv.contains("sni,ipv4/tcp/tls"));

        let json = render(OutputFormat::Json, &rows);
        assert!(json.contains("\"layers\":\"ipv4/tcp/tls\""));
    }
}
