//! Commands with named parameters.
//!
//! Statement text uses `@name` placeholders. Before execution against
//! PostgreSQL they are rewritten to positional `$n` placeholders by
//! [`Command::to_positional`].

use crate::connection::Connection;
use crate::error::OrmResult;
use crate::value::{ToValue, Value};
use std::fmt;

/// A named parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// Statement text plus its named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    sql: String,
    params: Vec<Parameter>,
}

impl Command {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Append a parameter. A leading `@` on `name` is optional.
    ///
    /// Parameters are appended as given; adding the same name twice keeps both
    /// and the first one is the one a placeholder resolves to.
    pub fn add_with_value(&mut self, name: impl AsRef<str>, value: impl ToValue) -> &mut Self {
        let name = name.as_ref();
        let name = name.strip_prefix('@').unwrap_or(name);
        self.params.push(Parameter {
            name: name.to_string(),
            value: value.to_value(),
        });
        self
    }

    /// Append every parameter of `params`.
    pub fn bind_params<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        params.add_to(self);
        self
    }

    fn find(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Rewrite `@name` placeholders into `$n` and collect the referenced values.
    ///
    /// Names are matched case-insensitively; a name used twice reuses its
    /// ordinal. String literals, quoted identifiers and comments are copied
    /// untouched, as is an `@` that does not start an identifier (`@>`, `<@`).
    /// A placeholder with no matching parameter is left verbatim.
    pub fn to_positional(&self) -> (String, Vec<&Value>) {
        let src = self.sql.as_str();
        let bytes = src.as_bytes();
        let mut out = String::with_capacity(src.len());
        let mut ordinals: Vec<&Parameter> = Vec::new();
        let mut i = 0;
        let mut copied = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\'' => {
                    let escapes = i > 0
                        && matches!(bytes[i - 1], b'E' | b'e')
                        && !prev_is_ident(bytes, i - 1);
                    i = skip_quoted(bytes, i, b'\'', escapes);
                }
                b'$' if !prev_is_ident(bytes, i) => match dollar_tag(bytes, i) {
                    Some(body) => {
                        let tag = &src[i..body];
                        i = src[body..].find(tag).map_or(bytes.len(), |p| body + p + tag.len());
                    }
                    None => i += 1,
                },
                b'"' => i = skip_quoted(bytes, i, b'"', false),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = bytes[i..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(bytes.len(), |p| i + p + 1);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = src[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                }
                b'@' if is_ident_start(bytes.get(i + 1)) && !prev_is_at(bytes, i) => {
                    let start = i + 1;
                    let end = start
                        + bytes[start..]
                            .iter()
                            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_')
                            .count();
                    let name = &src[start..end];
                    if let Some(param) = self.find(name) {
                        let ordinal = match ordinals.iter().position(|p| std::ptr::eq(*p, param)) {
                            Some(pos) => pos + 1,
                            None => {
                                ordinals.push(param);
                                ordinals.len()
                            }
                        };
                        out.push_str(&src[copied..i]);
                        out.push('$');
                        out.push_str(&ordinal.to_string());
                        copied = end;
                    }
                    i = end;
                }
                _ => i += 1,
            }
        }
        out.push_str(&src[copied..]);

        (out, ordinals.into_iter().map(|p| &p.value).collect())
    }
}

fn is_ident_start(b: Option<&u8>) -> bool {
    matches!(b, Some(b) if b.is_ascii_alphabetic() || *b == b'_')
}

fn prev_is_at(bytes: &[u8], i: usize) -> bool {
    i > 0 && bytes[i - 1] == b'@'
}

/// Whether the byte before `i` continues an identifier (or a `$n` parameter).
fn prev_is_ident(bytes: &[u8], i: usize) -> bool {
    i > 0 && matches!(bytes[i - 1], b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' | 0x80..=0xFF)
}

/// For a `$tag$` or `$$` opening at `start`, the index just past it.
///
/// `$1` style positional parameters are not dollar quotes.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'$' => return Some(i + 1),
            b'0'..=b'9' if i == start + 1 => return None,
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => i += 1,
            _ => return None,
        }
    }
    None
}

/// Index just past the closing quote of the literal starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            // Doubled quote is an escaped quote.
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// A holder of ad-hoc named parameters.
///
/// Implemented for every entity (members under their declared names), `()`,
/// `Option<P>` (`None` adds nothing) and collections of `(name, value)` pairs.
pub trait ToParams {
    fn add_to(&self, command: &mut Command);
}

impl ToParams for () {
    fn add_to(&self, _command: &mut Command) {}
}

impl<P: ToParams> ToParams for Option<P> {
    fn add_to(&self, command: &mut Command) {
        if let Some(params) = self {
            params.add_to(command);
        }
    }
}

impl<K: AsRef<str>, V: ToValue> ToParams for [(K, V)] {
    fn add_to(&self, command: &mut Command) {
        for (name, value) in self {
            command.add_with_value(name, value);
        }
    }
}

impl<K: AsRef<str>, V: ToValue, const N: usize> ToParams for [(K, V); N] {
    fn add_to(&self, command: &mut Command) {
        self.as_slice().add_to(command);
    }
}

impl<K: AsRef<str>, V: ToValue> ToParams for Vec<(K, V)> {
    fn add_to(&self, command: &mut Command) {
        self.as_slice().add_to(command);
    }
}

impl<T: crate::member::Entity> ToParams for T {
    fn add_to(&self, command: &mut Command) {
        for member in T::MEMBERS {
            command.add_with_value(member.name(), member.get(self));
        }
    }
}

/// An ordered group of commands executed together on one connection.
///
/// Commands run in the order they were pushed. Reading a batch yields one
/// result set per command.
///
/// A batch is not a transaction. When a command fails its error is returned,
/// but commands that already ran stay applied and pipelined commands after it
/// may run too. Build the batch on a `Transaction` for all-or-nothing writes.
pub struct Batch<'c, C: Connection> {
    conn: &'c C,
    commands: Vec<Command>,
}

impl<'c, C: Connection> Batch<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut Vec<Command> {
        &mut self.commands
    }

    pub fn connection(&self) -> &'c C {
        self.conn
    }

    /// Execute every command. Returns the total affected row count.
    pub async fn execute(&self) -> OrmResult<u64> {
        if self.commands.is_empty() {
            return Ok(0);
        }
        self.conn.execute_batch(&self.commands).await
    }
}

impl<C: Connection> fmt::Debug for Batch<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch").field("commands", &self.commands).finish()
    }
}
