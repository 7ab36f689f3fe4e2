//! In-memory connection and a hand-written entity for unit tests.

use crate::command::Command;
use crate::connection::Connection;
use crate::convert::FromValue;
use crate::error::{OrmError, OrmResult};
use crate::mapper::{FromRow, Mapping, TypeMetadata};
use crate::member::{Entity, Member};
use crate::reader::{BufferedReader, BufferedRow};
use crate::value::{ToValue, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl Entity for Person {
    const TABLE: &'static str = "person";

    const MEMBERS: &'static [Member<Self>] = &[
        Member::new(
            "Id",
            |p: &Person| p.id.to_value(),
            |p: &mut Person, v: Value| {
                p.id = FromValue::from_value(v)?;
                Ok(())
            },
        ),
        Member::new(
            "Name",
            |p: &Person| p.name.to_value(),
            |p: &mut Person, v: Value| {
                p.name = FromValue::from_value(v)?;
                Ok(())
            },
        ),
        Member::new(
            "Email",
            |p: &Person| p.email.to_value(),
            |p: &mut Person, v: Value| {
                p.email = FromValue::from_value(v)?;
                Ok(())
            },
        ),
        Member::new(
            "Age",
            |p: &Person| p.age.to_value(),
            |p: &mut Person, v: Value| {
                p.age = FromValue::from_value(v)?;
                Ok(())
            },
        ),
    ];

    fn metadata() -> &'static TypeMetadata<Self> {
        static METADATA: OnceLock<TypeMetadata<Person>> = OnceLock::new();
        METADATA.get_or_init(|| TypeMetadata::new(Self::MEMBERS, Person::default))
    }
}

impl FromRow for Person {
    fn mapping() -> Mapping<Self> {
        Mapping::Structured(Self::metadata())
    }
}

pub fn row(columns: &[(&str, Value)]) -> BufferedRow {
    BufferedRow::new(columns.iter().cloned().map(|(n, v)| (n.to_string(), v)))
}

/// Reader handed out by [`MockConnection`]; counts its own release.
#[derive(Debug)]
pub struct MockReader {
    inner: BufferedReader,
    dropped: Arc<AtomicUsize>,
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl crate::reader::Reader for MockReader {
    type Row = BufferedRow;

    async fn read(&mut self) -> OrmResult<Option<BufferedRow>> {
        self.inner.read().await
    }

    async fn next_result(&mut self) -> OrmResult<bool> {
        self.inner.next_result().await
    }
}

/// A connection that records every command and replays scripted result sets.
///
/// Each reader call consumes the next script entry; a missing entry yields a
/// reader without rows.
#[derive(Debug, Default)]
pub struct MockConnection {
    scripts: Mutex<VecDeque<OrmResult<Vec<Vec<BufferedRow>>>>>,
    executed: Mutex<Vec<Command>>,
    affected: u64,
    released: Arc<AtomicUsize>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one reader over `sets` result sets.
    pub fn returning(self, sets: Vec<Vec<BufferedRow>>) -> Self {
        self.push(Ok(sets))
    }

    /// Script one reader over a single result set.
    pub fn returning_rows(self, rows: Vec<BufferedRow>) -> Self {
        self.push(Ok(vec![rows]))
    }

    pub fn failing(self, error: OrmError) -> Self {
        self.push(Err(error))
    }

    /// Rows reported per non-query command.
    pub fn affecting(mut self, rows: u64) -> Self {
        self.affected = rows;
        self
    }

    fn push(self, script: OrmResult<Vec<Vec<BufferedRow>>>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(script);
        }
        self
    }

    pub fn executed(&self) -> Vec<Command> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn record(&self, commands: &[Command]) {
        if let Ok(mut executed) = self.executed.lock() {
            executed.extend_from_slice(commands);
        }
    }

    fn next_reader(&self) -> OrmResult<MockReader> {
        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(MockReader {
            inner: BufferedReader::new(script),
            dropped: Arc::clone(&self.released),
        })
    }
}

impl Connection for MockConnection {
    type Reader = MockReader;

    async fn execute_reader(&self, command: &Command) -> OrmResult<MockReader> {
        self.record(std::slice::from_ref(command));
        self.next_reader()
    }

    async fn execute_batch_reader(&self, commands: &[Command]) -> OrmResult<MockReader> {
        self.record(commands);
        self.next_reader()
    }

    async fn execute(&self, command: &Command) -> OrmResult<u64> {
        self.record(std::slice::from_ref(command));
        Ok(self.affected)
    }

    async fn execute_batch(&self, commands: &[Command]) -> OrmResult<u64> {
        self.record(commands);
        Ok(self.affected * commands.len() as u64)
    }
}
