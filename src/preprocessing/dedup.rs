//! Exact duplicate row removal

use crate::error::Result;
use polars::prelude::*;
use std::collections::HashSet;

/// Hashable view of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cell<'a> {
    Missing,
    Number(u64),
    Text(&'a str),
}

fn number_key<'a>(v: f64) -> Cell<'a> {
    if v.is_nan() {
        Cell::Missing
    } else if v == 0.0 {
        // -0.0 and 0.0 compare equal
        Cell::Number(0.0f64.to_bits())
    } else {
        Cell::Number(v.to_bits())
    }
}

fn column_cells(s: &Series) -> PolarsResult<Vec<Cell<'_>>> {
    if s.dtype() == &DataType::Float64 {
        Ok(s.f64()?
            .into_iter()
            .map(|v| v.map_or(Cell::Missing, number_key))
            .collect())
    } else {
        Ok(s.str()?
            .into_iter()
            .map(|v| v.map_or(Cell::Missing, Cell::Text))
            .collect())
    }
}

/// Drop rows identical to an earlier row across every column.
///
/// The first occurrence survives and relative order is preserved. Returns the
/// filtered frame and the number of rows removed.
pub fn drop_duplicate_rows(frame: &DataFrame) -> Result<(DataFrame, usize)> {
    let height = frame.height();

    // Non-float columns are compared through their string form
    let series: Vec<Series> = frame
        .get_columns()
        .iter()
        .map(|column| {
            let s = column.as_materialized_series();
            if s.dtype() == &DataType::Float64 || s.dtype() == &DataType::String {
                Ok(s.clone())
            } else {
                s.cast(&DataType::String)
            }
        })
        .collect::<PolarsResult<_>>()?;

    let cells: Vec<Vec<Cell<'_>>> = series
        .iter()
        .map(column_cells)
        .collect::<PolarsResult<_>>()?;

    let mut seen: HashSet<Vec<Cell<'_>>> = HashSet::with_capacity(height);
    let keep: Vec<bool> = (0..height)
        .map(|row| {
            let key: Vec<Cell<'_>> = cells.iter().map(|column| column[row]).collect();
            seen.insert(key)
        })
        .collect();

    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return Ok((frame.clone(), 0));
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((frame.filter(&mask)?, removed))
}
