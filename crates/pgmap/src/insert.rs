//! Batch and single-row inserts built from entity metadata.

use crate::bind::bind;
use crate::command::{Batch, Command};
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::member::{ColumnPlan, Entity};
use crate::naming::Naming;
use crate::statement::build_insert;

/// Options shared by the insert helpers.
///
/// ```ignore
/// let options = InsertOptions::new()
///     .exclude([User::COL_CREATED_AT])
///     .exists_check(["email"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOptions {
    pub naming: Naming,
    pub exclude: Vec<String>,
    pub exists_check: Vec<String>,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Use member names as declared instead of lowercasing them.
    pub fn verbatim(self) -> Self {
        self.naming(Naming::Verbatim)
    }

    /// Members left out of the statement (case-insensitive).
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Columns that must not match an existing row for the insert to happen.
    pub fn exists_check<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exists_check.extend(names.into_iter().map(Into::into));
        self
    }

    fn plan<T: Entity>(&self) -> OrmResult<ColumnPlan<T>> {
        let plan = ColumnPlan::new(self.exclude.as_slice(), self.naming);
        if let Some(missing) = self.exists_check.iter().find(|c| !plan.contains(c)) {
            return Err(OrmError::validation(format!(
                "exists-check column '{missing}' is not an inserted column of {}",
                T::TABLE
            )));
        }
        Ok(plan)
    }
}

impl<C: Connection> Batch<'_, C> {
    /// Append one insert command per item, all sharing one statement text.
    ///
    /// `table` is used as given. A `None` item binds every column as NULL.
    /// Returns the number of commands appended.
    pub fn add_insert_commands<'a, T, I>(
        &mut self,
        table: &str,
        items: I,
        options: &InsertOptions,
    ) -> OrmResult<usize>
    where
        T: Entity,
        I: IntoIterator,
        I::Item: Into<Option<&'a T>>,
    {
        let plan = options.plan::<T>()?;
        let sql = build_insert(table, &plan, options.exists_check.as_slice());

        let before = self.len();
        for item in items {
            let mut command = Command::new(sql.as_str());
            bind(&mut command, item.into(), &plan);
            self.push(command);
        }
        Ok(self.len() - before)
    }
}

/// Create a batch inserting every item into `table`.
///
/// The naming convention applies to the table name as well as the columns.
/// Nothing is executed; call [`Batch::execute`] on the result.
pub fn batch_insert<'c, 'a, C, T, I>(
    conn: &'c C,
    table: &str,
    items: I,
    options: &InsertOptions,
) -> OrmResult<Batch<'c, C>>
where
    C: Connection,
    T: Entity,
    I: IntoIterator,
    I::Item: Into<Option<&'a T>>,
{
    let table = options.naming.apply(table);
    let mut batch = Batch::new(conn);
    batch.add_insert_commands(&table, items, options)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "pgmap.sql",
        table = %table,
        commands = batch.len(),
        "built batch insert"
    );

    Ok(batch)
}

/// Insert one item into `table` (naming applied to the table name). Returns
/// the affected row count, which is `0` when an exists check matched.
pub async fn insert_one<C, T>(
    conn: &C,
    table: &str,
    item: &T,
    options: &InsertOptions,
) -> OrmResult<u64>
where
    C: Connection,
    T: Entity,
{
    let plan = options.plan::<T>()?;
    let table = options.naming.apply(table);
    let mut command = Command::new(build_insert(&table, &plan, options.exists_check.as_slice()));
    bind(&mut command, Some(item), &plan);
    conn.execute(&command).await
}
