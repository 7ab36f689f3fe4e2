//! Forward-only readers over one or more result sets.

use crate::error::{OrmError, OrmResult};
use crate::mapper::Record;
use crate::value::Value;
use std::collections::VecDeque;
use std::future::Future;

/// A forward-only cursor over the result sets produced by a command or batch.
///
/// Dropping a reader releases it; a reader does not have to be drained.
pub trait Reader: Send {
    type Row: Record + Send;

    /// Advance to the next row of the current result set.
    fn read(&mut self) -> impl Future<Output = OrmResult<Option<Self::Row>>> + Send;

    /// Advance to the next result set. Returns `false` when none remain.
    fn next_result(&mut self) -> impl Future<Output = OrmResult<bool>> + Send;
}

/// A decoded row held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRow {
    columns: Vec<(String, Value)>,
}

impl BufferedRow {
    pub fn new(columns: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    /// Snapshot any record into memory.
    pub fn from_record<R: Record + ?Sized>(record: &R) -> OrmResult<Self> {
        let columns = (0..record.field_count())
            .map(|i| Ok((record.name(i).to_string(), record.value(i)?)))
            .collect::<OrmResult<_>>()?;
        Ok(Self { columns })
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.columns.push((name.into(), value.into()));
        self
    }
}

impl Record for BufferedRow {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn name(&self, index: usize) -> &str {
        &self.columns[index].0
    }

    fn value(&self, index: usize) -> OrmResult<Value> {
        self.columns
            .get(index)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| OrmError::Other(format!("column index {index} out of range")))
    }
}

/// A reader over result sets already held in memory.
#[derive(Debug, Default)]
pub struct BufferedReader<R = BufferedRow> {
    current: VecDeque<R>,
    pending: VecDeque<Vec<R>>,
}

impl<R> BufferedReader<R> {
    /// Reader positioned on the first of `result_sets`.
    pub fn new(result_sets: impl IntoIterator<Item = Vec<R>>) -> Self {
        let mut pending: VecDeque<Vec<R>> = result_sets.into_iter().collect();
        let current = pending.pop_front().map(VecDeque::from).unwrap_or_default();
        Self { current, pending }
    }
}

impl<R: Record + Send> Reader for BufferedReader<R> {
    type Row = R;

    async fn read(&mut self) -> OrmResult<Option<R>> {
        Ok(self.current.pop_front())
    }

    async fn next_result(&mut self) -> OrmResult<bool> {
        match self.pending.pop_front() {
            Some(next) => {
                self.current = VecDeque::from(next);
                Ok(true)
            }
            None => {
                self.current.clear();
                Ok(false)
            }
        }
    }
}
