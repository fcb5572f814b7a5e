//! Multi-series time-indexed table.
//!
//! A [`TimeSeriesFrame`] holds many series stacked row-wise. Every row is keyed
//! by an item id and a timestamp, and carries one value per named column.
//! Rows of one item must form a single contiguous run; chronological order
//! within a run is assumed.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{EvalError, Result};

/// Contiguous run of rows belonging to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpan {
    pub item_id: String,
    pub start: usize,
    pub len: usize,
}

impl ItemSpan {
    /// Row range covered by this item.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesFrame {
    item_ids: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<(String, Vec<f64>)>,
    spans: Vec<ItemSpan>,
}

impl TimeSeriesFrame {
    /// Create a frame from its row index. Columns are added with [`with_column`].
    ///
    /// Fails if the index vectors differ in length or if an item's rows are
    /// split into more than one run.
    ///
    /// [`with_column`]: TimeSeriesFrame::with_column
    pub fn new(item_ids: Vec<String>, timestamps: Vec<NaiveDateTime>) -> Result<Self> {
        if item_ids.len() != timestamps.len() {
            return Err(EvalError::InvalidInput(format!(
                "Item ids and timestamps must have the same length: {} vs {}",
                item_ids.len(),
                timestamps.len()
            )));
        }
        let spans = compute_spans(&item_ids)?;
        Ok(Self {
            item_ids,
            timestamps,
            columns: Vec::new(),
            spans,
        })
    }

    /// Build a frame of regularly spaced series sharing a start time.
    ///
    /// Each entry of `series` is `(item_id, values)`; values go into `column`.
    pub fn from_regular_series(
        column: &str,
        start: NaiveDateTime,
        freq: TimeDelta,
        series: &[(&str, &[f64])],
    ) -> Result<Self> {
        let n_rows: usize = series.iter().map(|(_, values)| values.len()).sum();
        let mut item_ids = Vec::with_capacity(n_rows);
        let mut timestamps = Vec::with_capacity(n_rows);
        let mut values = Vec::with_capacity(n_rows);

        for (item_id, item_values) in series {
            let mut ts = start;
            for &v in item_values.iter() {
                item_ids.push((*item_id).to_string());
                timestamps.push(ts);
                values.push(v);
                ts = ts.checked_add_signed(freq).ok_or_else(|| {
                    EvalError::InvalidInput(format!("Timestamp overflow for item '{}'", item_id))
                })?;
            }
        }

        Self::new(item_ids, timestamps)?.with_column(column, values)
    }

    /// Add a column, replacing any existing column of the same name.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.num_rows() {
            return Err(EvalError::InvalidInput(format!(
                "Column '{}' has {} values but the frame has {} rows",
                name,
                values.len(),
                self.num_rows()
            )));
        }
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(self)
    }

    /// Rename a column. Renaming onto an existing name replaces that column.
    pub fn rename_column(mut self, from: &str, to: &str) -> Result<Self> {
        let pos = self
            .columns
            .iter()
            .position(|(n, _)| n == from)
            .ok_or_else(|| EvalError::MissingColumn(from.to_string()))?;
        let (_, values) = self.columns.remove(pos);
        self.columns.retain(|(n, _)| n != to);
        self.columns.insert(pos.min(self.columns.len()), (to.to_string(), values));
        Ok(self)
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.get_column(name)
            .ok_or_else(|| EvalError::MissingColumn(name.to_string()))
    }

    pub fn get_column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, values)` pairs in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn num_rows(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// Item id of every row.
    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }

    /// Timestamp of every row.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Item runs in table order.
    pub fn item_spans(&self) -> &[ItemSpan] {
        &self.spans
    }

    pub fn num_items(&self) -> usize {
        self.spans.len()
    }

    /// Number of rows for each item, in table order.
    pub fn num_timesteps_per_item(&self) -> Vec<(&str, usize)> {
        self.spans
            .iter()
            .map(|s| (s.item_id.as_str(), s.len))
            .collect()
    }

    /// Slice every item by position, with Python slice semantics.
    ///
    /// Negative bounds count from the end of each item and out-of-range
    /// bounds are clamped. `slice_by_timestep(None, Some(-h))` keeps all but
    /// the last `h` steps of each item, `slice_by_timestep(Some(-h), None)`
    /// keeps only the last `h`. Items that end up empty are dropped.
    pub fn slice_by_timestep(&self, start: Option<isize>, end: Option<isize>) -> Self {
        let mut rows = Vec::with_capacity(self.num_rows());
        for span in &self.spans {
            let lo = resolve_bound(start, span.len, 0);
            let hi = resolve_bound(end, span.len, span.len);
            if lo < hi {
                rows.extend(span.start + lo..span.start + hi);
            }
        }
        self.take_rows(&rows)
    }

    /// True if both frames have the same `(item_id, timestamp)` rows in the same order.
    pub fn index_equals(&self, other: &TimeSeriesFrame) -> bool {
        self.item_ids == other.item_ids && self.timestamps == other.timestamps
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        let item_ids: Vec<String> = rows.iter().map(|&i| self.item_ids[i].clone()).collect();
        let timestamps = rows.iter().map(|&i| self.timestamps[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let taken: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
                (name.clone(), taken)
            })
            .collect();
        // Rows come from whole-item runs in order, so contiguity is preserved.
        let spans = spans_unchecked(&item_ids);
        Self {
            item_ids,
            timestamps,
            columns,
            spans,
        }
    }
}

fn resolve_bound(bound: Option<isize>, len: usize, default: usize) -> usize {
    match bound {
        None => default,
        Some(b) if b < 0 => len.saturating_sub(b.unsigned_abs()),
        Some(b) => (b as usize).min(len),
    }
}

fn spans_unchecked(item_ids: &[String]) -> Vec<ItemSpan> {
    let mut spans: Vec<ItemSpan> = Vec::new();
    for (row, id) in item_ids.iter().enumerate() {
        match spans.last_mut() {
            Some(last) if last.item_id == *id => last.len += 1,
            _ => spans.push(ItemSpan {
                item_id: id.clone(),
                start: row,
                len: 1,
            }),
        }
    }
    spans
}

fn compute_spans(item_ids: &[String]) -> Result<Vec<ItemSpan>> {
    let spans = spans_unchecked(item_ids);
    let mut seen = HashSet::with_capacity(spans.len());
    for span in &spans {
        if !seen.insert(span.item_id.as_str()) {
            return Err(EvalError::InvalidInput(format!(
                "Rows for item '{}' are not contiguous",
                span.item_id
            )));
        }
    }
    Ok(spans)
}
