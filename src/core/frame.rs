//! The time-tagged data record moved across ports.
//!
//! A frame's payload is conceptually opaque to the port layer; the module
//! layer defines the schema. The two payload shapes mirror the port document
//! format: named scalars per time tag, or the "time-tables" variant with
//! named columns of sequences.

use serde::{Deserialize, Serialize};

/// Payload of one time-tagged record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FramePayload {
    /// Named scalar values.
    Scalars(Vec<(String, f64)>),
    /// Named columns of values ("time-tables" variant).
    Tables(Vec<(String, Vec<f64>)>),
}

/// One record exchanged over a port, tagged with its simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: u64,
    pub payload: FramePayload,
}

impl Frame {
    /// Build a scalar frame from named values.
    pub fn scalars(time: u64, values: Vec<(String, f64)>) -> Self {
        Self {
            time,
            payload: FramePayload::Scalars(values),
        }
    }

    /// Build a scalar frame holding a single variable.
    pub fn scalar(time: u64, name: &str, value: f64) -> Self {
        Self::scalars(time, vec![(name.to_string(), value)])
    }

    /// Build a time-tables frame from named columns.
    pub fn tables(time: u64, columns: Vec<(String, Vec<f64>)>) -> Self {
        Self {
            time,
            payload: FramePayload::Tables(columns),
        }
    }

    /// Build a zero-valued record for the given variables, the conventional
    /// first publication of a module that has not yet computed a step.
    pub fn zeros(time: u64, variables: &[String]) -> Self {
        Self::scalars(time, variables.iter().map(|v| (v.clone(), 0.0)).collect())
    }

    /// Look up a scalar variable by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match &self.payload {
            FramePayload::Scalars(values) => values
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v),
            FramePayload::Tables(_) => None,
        }
    }

    /// Look up a column by name in a time-tables frame.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match &self.payload {
            FramePayload::Tables(columns) => columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, c)| c.as_slice()),
            FramePayload::Scalars(_) => None,
        }
    }

    /// Names of the variables or columns carried by this frame.
    pub fn variable_names(&self) -> Vec<&str> {
        match &self.payload {
            FramePayload::Scalars(values) => values.iter().map(|(n, _)| n.as_str()).collect(),
            FramePayload::Tables(columns) => columns.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }
}
