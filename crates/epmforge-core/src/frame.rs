use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Round to two decimal places, the precision of every measure column.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A single cell in the working frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell: numbers directly, text if it parses.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Text(value) => value.trim().parse::<f64>().ok(),
            CellValue::Null => None,
        }
    }

    /// JSON representation; non-finite numbers degrade to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Number(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(value) => serde_json::Value::String(value.clone()),
        }
    }

    /// CSV field representation; null becomes an empty field.
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(value) => value.to_string(),
            CellValue::Text(value) => value.clone(),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Columnar working table: named columns of equal length.
///
/// The generation and validation stages are column-vectorized; rows only
/// materialize at the output boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<CellValue>>,
    len: usize,
}

impl Frame {
    /// Empty frame with a fixed row count; columns are added afterwards.
    pub fn with_len(len: usize) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            len,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.len
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .map(|index| self.columns[index].as_slice())
    }

    /// Insert or overwrite a column. The value count must match the frame's
    /// row count.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<()> {
        if values.len() != self.len {
            return Err(Error::InvalidFrame(format!(
                "column '{}' has {} values for a frame of {} rows",
                name,
                values.len(),
                self.len
            )));
        }
        match self.names.iter().position(|existing| existing == name) {
            Some(index) => self.columns[index] = values,
            None => {
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }
        Ok(())
    }

    /// Replace a column through a cell-wise mapping. No-op when absent.
    pub fn map_column<F>(&mut self, name: &str, mut apply: F)
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        if let Some(index) = self.names.iter().position(|existing| existing == name) {
            let mapped = self.columns[index].iter().map(|cell| apply(cell)).collect();
            self.columns[index] = mapped;
        }
    }

    /// New frame containing the named columns that exist, in the given order.
    pub fn select(&self, order: &[String]) -> Frame {
        let mut selected = Frame::with_len(self.len);
        for name in order {
            if let Some(index) = self.names.iter().position(|existing| existing == name) {
                selected.names.push(name.clone());
                selected.columns.push(self.columns[index].clone());
            }
        }
        selected
    }

    /// Materialize rows as JSON objects, preserving column order.
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        (0..self.len)
            .map(|row| {
                let mut object = serde_json::Map::new();
                for (name, column) in self.names.iter().zip(&self.columns) {
                    object.insert(name.clone(), column[row].to_json());
                }
                serde_json::Value::Object(object)
            })
            .collect()
    }
}
