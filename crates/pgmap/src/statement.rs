//! INSERT statement text generation.
//!
//! Text depends only on the shape of a [`ColumnPlan`], never on row data, so a
//! batch builds it once and reuses it for every row.

use crate::member::ColumnPlan;

/// Build an insert statement for `plan` into `table`.
///
/// An empty `exists_check` selects the plain form:
///
/// ```text
/// INSERT INTO users(id,name) VALUES(@id,@name)
/// ```
///
/// Otherwise the existence-checked form, one `t.<col> = @<col>` conjunct per
/// check column (the plan's naming convention applied):
///
/// ```text
/// INSERT INTO users(id,name) SELECT @id,@name WHERE NOT EXISTS (SELECT 1 FROM users t WHERE t.id = @id)
/// ```
///
/// `table` is used as given.
pub fn build_insert<T: 'static, S: AsRef<str>>(
    table: &str,
    plan: &ColumnPlan<T>,
    exists_check: &[S],
) -> String {
    let columns = plan.names().collect::<Vec<_>>().join(",");
    let params = plan
        .names()
        .map(|name| format!("@{name}"))
        .collect::<Vec<_>>()
        .join(",");

    if exists_check.is_empty() {
        return format!("INSERT INTO {table}({columns}) VALUES({params})");
    }

    let naming = plan.naming();
    let conditions = exists_check
        .iter()
        .map(|column| {
            let column = naming.apply(column.as_ref());
            format!("t.{column} = @{column}")
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "INSERT INTO {table}({columns}) SELECT {params} WHERE NOT EXISTS (SELECT 1 FROM {table} t WHERE {conditions})"
    )
}
