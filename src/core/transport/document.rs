//! Codec for port and status documents.
//!
//! A port document carries a header (port name, declared variables, time
//! unit) followed by an ordered sequence of time-tagged records:
//!
//! ```text
//! port: outflow
//! time_unit: min
//! variables: mass,volume
//! format: scalars
//! 0: 0.000000,0.000000
//! 25: 3.000000,1.500000
//! ```
//!
//! The time-tables variant holds named columns of comma-separated sequences
//! per time tag:
//!
//! ```text
//! 60: temp=1.000000,2.000000; flow=0.500000,0.400000
//! ```
//!
//! Scalars are rounded to a fixed number of decimal places on write, so a
//! write/read round-trip is exact. Parsing never mutates the document.

use std::path::Path;
use std::str::FromStr;

use crate::core::error::{CouplingError, CouplingResult};
use crate::core::frame::{Frame, FramePayload};
use crate::core::time::TimeUnit;

/// Decimal places kept when writing scalar values.
pub const DECIMAL_PLACES: usize = 6;

/// The rounding policy applied to every scalar on write.
pub fn round_scalar(value: f64) -> f64 {
    let factor = 10f64.powi(DECIMAL_PLACES as i32);
    (value * factor).round() / factor
}

/// Record layout of a port document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Scalars,
    Tables,
}

impl DocumentFormat {
    fn label(&self) -> &'static str {
        match self {
            DocumentFormat::Scalars => "scalars",
            DocumentFormat::Tables => "tables",
        }
    }
}

/// Header of a port document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHeader {
    pub port: String,
    pub time_unit: TimeUnit,
    pub variables: Vec<String>,
    pub format: DocumentFormat,
}

impl DocumentHeader {
    pub fn scalars(port: &str, time_unit: TimeUnit, variables: Vec<String>) -> Self {
        Self {
            port: port.to_string(),
            time_unit,
            variables,
            format: DocumentFormat::Scalars,
        }
    }

    pub fn tables(port: &str, time_unit: TimeUnit, variables: Vec<String>) -> Self {
        Self {
            port: port.to_string(),
            time_unit,
            variables,
            format: DocumentFormat::Tables,
        }
    }

    /// Render the header lines.
    pub fn render(&self) -> String {
        format!(
            "port: {}\ntime_unit: {}\nvariables: {}\nformat: {}\n",
            self.port,
            self.time_unit,
            self.variables.join(","),
            self.format.label()
        )
    }
}

/// A parsed or under-construction port document.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDocument {
    pub header: DocumentHeader,
    pub records: Vec<Frame>,
}

fn document_err(path: &str, reason: impl Into<String>) -> CouplingError {
    CouplingError::Document {
        path: path.to_string(),
        reason: reason.into(),
    }
}

impl PortDocument {
    pub fn new(header: DocumentHeader) -> Self {
        Self {
            header,
            records: Vec::new(),
        }
    }

    /// Append one record, validating it against the declared variables.
    pub fn push(&mut self, frame: Frame) -> CouplingResult<()> {
        Self::check_frame(&self.header, &frame)?;
        self.records.push(frame);
        Ok(())
    }

    /// Find the record tagged with `time`, if present.
    pub fn record_at(&self, time: u64) -> Option<&Frame> {
        self.records.iter().find(|r| r.time == time)
    }

    fn check_frame(header: &DocumentHeader, frame: &Frame) -> CouplingResult<()> {
        let names = frame.variable_names();
        for var in &header.variables {
            if !names.iter().any(|n| n == var) {
                return Err(CouplingError::Configuration(format!(
                    "record t={} is missing declared variable '{}' of port '{}'",
                    frame.time, var, header.port
                )));
            }
        }
        let wants_tables = matches!(frame.payload, FramePayload::Tables(_));
        let is_tables = header.format == DocumentFormat::Tables;
        if wants_tables != is_tables {
            return Err(CouplingError::Configuration(format!(
                "record t={} does not match the '{}' format of port '{}'",
                frame.time,
                header.format.label(),
                header.port
            )));
        }
        Ok(())
    }

    /// Render one record line in the document's layout.
    pub fn render_record(header: &DocumentHeader, frame: &Frame) -> CouplingResult<String> {
        Self::check_frame(header, frame)?;
        let line = match &frame.payload {
            FramePayload::Scalars(_) => {
                let values: Vec<String> = header
                    .variables
                    .iter()
                    .map(|var| {
                        // check_frame guarantees presence
                        let v = frame.get(var).unwrap_or(0.0);
                        format!("{:.*}", DECIMAL_PLACES, round_scalar(v))
                    })
                    .collect();
                format!("{}: {}\n", frame.time, values.join(","))
            }
            FramePayload::Tables(columns) => {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|(name, column)| {
                        let seq: Vec<String> = column
                            .iter()
                            .map(|v| format!("{:.*}", DECIMAL_PLACES, round_scalar(*v)))
                            .collect();
                        format!("{}={}", name, seq.join(","))
                    })
                    .collect();
                format!("{}: {}\n", frame.time, cells.join("; "))
            }
        };
        Ok(line)
    }

    /// Render the full document.
    pub fn render(&self) -> CouplingResult<String> {
        let mut out = self.header.render();
        for record in &self.records {
            out.push_str(&Self::render_record(&self.header, record)?);
        }
        Ok(out)
    }

    /// Parse a document from text. `path` is used for error context only.
    pub fn parse(text: &str, path: &str) -> CouplingResult<Self> {
        let mut port = None;
        let mut time_unit = None;
        let mut variables: Option<Vec<String>> = None;
        let mut format = DocumentFormat::Scalars;
        let mut records = Vec::new();
        let mut in_header = true;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| document_err(path, format!("line without ':' separator: '{}'", line)))?;
            let (key, value) = (key.trim(), value.trim());

            if in_header && key.parse::<u64>().is_err() {
                match key {
                    "port" => port = Some(value.to_string()),
                    "time_unit" => {
                        time_unit = Some(
                            TimeUnit::from_str(value)
                                .map_err(|e| document_err(path, e.to_string()))?,
                        )
                    }
                    "variables" => {
                        variables = Some(
                            value
                                .split(',')
                                .map(|v| v.trim().to_string())
                                .filter(|v| !v.is_empty())
                                .collect(),
                        )
                    }
                    "format" => {
                        format = match value {
                            "scalars" => DocumentFormat::Scalars,
                            "tables" => DocumentFormat::Tables,
                            other => {
                                return Err(document_err(
                                    path,
                                    format!("unknown format '{}'", other),
                                ))
                            }
                        }
                    }
                    other => {
                        return Err(document_err(path, format!("unknown header field '{}'", other)))
                    }
                }
                continue;
            }
            in_header = false;

            let time: u64 = key
                .parse()
                .map_err(|_| document_err(path, format!("invalid time tag '{}'", key)))?;
            let vars = variables
                .as_ref()
                .ok_or_else(|| document_err(path, "record before 'variables' header"))?;
            let frame = match format {
                DocumentFormat::Scalars => Self::parse_scalars(time, value, vars, path)?,
                DocumentFormat::Tables => Self::parse_tables(time, value, path)?,
            };
            records.push(frame);
        }

        let header = DocumentHeader {
            port: port.ok_or_else(|| document_err(path, "missing 'port' header"))?,
            time_unit: time_unit.ok_or_else(|| document_err(path, "missing 'time_unit' header"))?,
            variables: variables.ok_or_else(|| document_err(path, "missing 'variables' header"))?,
            format,
        };
        Ok(Self { header, records })
    }

    fn parse_scalars(
        time: u64,
        value: &str,
        variables: &[String],
        path: &str,
    ) -> CouplingResult<Frame> {
        let scalars: Vec<f64> = value
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| document_err(path, format!("invalid scalar '{}' at t={}", v, time)))
            })
            .collect::<CouplingResult<_>>()?;
        if scalars.len() != variables.len() {
            return Err(document_err(
                path,
                format!(
                    "record t={} has {} values for {} declared variables",
                    time,
                    scalars.len(),
                    variables.len()
                ),
            ));
        }
        Ok(Frame::scalars(
            time,
            variables.iter().cloned().zip(scalars).collect(),
        ))
    }

    fn parse_tables(time: u64, value: &str, path: &str) -> CouplingResult<Frame> {
        let mut columns = Vec::new();
        for cell in value.split(';') {
            let (name, seq) = cell.split_once('=').ok_or_else(|| {
                document_err(path, format!("table cell without '=' at t={}: '{}'", time, cell))
            })?;
            let values: Vec<f64> = seq
                .split(',')
                .map(|v| {
                    v.trim().parse::<f64>().map_err(|_| {
                        document_err(path, format!("invalid value '{}' at t={}", v, time))
                    })
                })
                .collect::<CouplingResult<_>>()?;
            columns.push((name.trim().to_string(), values));
        }
        Ok(Frame::tables(time, columns))
    }

    /// Load and parse a document from disk.
    pub fn load(path: &Path) -> CouplingResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }
}

/// Render a status document holding a single status field.
pub fn render_status(label: &str) -> String {
    format!("status: {}\n", label)
}

/// Parse a status document, returning the raw status label.
pub fn parse_status(text: &str, path: &str) -> CouplingResult<String> {
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(value) = line.strip_prefix("status:") {
            return Ok(value.trim().to_string());
        }
    }
    Err(document_err(path, "missing 'status' field"))
}
