//! Binding entity members onto command parameters.

use crate::command::Command;
use crate::member::{ColumnPlan, Entity};
use crate::naming::Naming;
use crate::value::Value;

/// Bind every planned column of `instance` onto `command`.
///
/// Each exposed name is bound to the member's value; an absent instance binds
/// every column as NULL. Values are passed through untouched. Parameters are
/// appended, so binding twice duplicates them.
pub fn bind<'c, T: 'static>(
    command: &'c mut Command,
    instance: Option<&T>,
    plan: &ColumnPlan<T>,
) -> &'c mut Command {
    for column in plan {
        let value = instance.map_or(Value::Null, |item| column.member.get(item));
        command.add_with_value(&column.name, value);
    }
    command
}

/// Plan the columns of `T` and bind `instance` onto `command`.
pub fn build_parameters<'c, T: Entity, S: AsRef<str>>(
    command: &'c mut Command,
    instance: Option<&T>,
    naming: Naming,
    exclude: &[S],
) -> &'c mut Command {
    let plan = ColumnPlan::<T>::new(exclude, naming);
    bind(command, instance, &plan)
}
