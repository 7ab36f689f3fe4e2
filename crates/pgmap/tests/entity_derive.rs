use pgmap::prelude::*;
use pgmap::{BufferedRow, ColumnPlan, RowMapper, build_insert, map_row};

#[derive(Debug, Default, PartialEq, Entity)]
#[orm(table = "customers")]
struct Customer {
    id: i32,
    #[orm(column = "FullName")]
    full_name: String,
    email: Option<String>,
    #[orm(skip)]
    visits: u32,
    r#type: Option<String>,
}

#[derive(Debug, Default, Entity)]
struct OrderLine {
    order_id: i64,
    qty: i16,
}

fn row(columns: &[(&str, Value)]) -> BufferedRow {
    BufferedRow::new(columns.iter().cloned().map(|(n, v)| (n.to_string(), v)))
}

#[test]
fn members_follow_declaration_order() {
    let names: Vec<_> = Customer::MEMBERS.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["id", "FullName", "email", "type"]);
}

#[test]
fn table_defaults_to_snake_case() {
    assert_eq!(Customer::TABLE, "customers");
    assert_eq!(OrderLine::TABLE, "order_line");
}

#[test]
fn column_constants_name_members() {
    assert_eq!(Customer::COL_ID, "id");
    assert_eq!(Customer::COL_FULL_NAME, "FullName");
    assert_eq!(Customer::COL_TYPE, "type");
    assert_eq!(OrderLine::COL_ORDER_ID, "order_id");
}

#[test]
fn metadata_is_built_once() {
    let a = Customer::metadata() as *const _;
    let b = Customer::metadata() as *const _;
    assert_eq!(a, b);
}

#[test]
fn accessors_round_trip_member_values() {
    let mut c = Customer::default();
    let full_name = Customer::MEMBERS
        .iter()
        .find(|m| m.name() == Customer::COL_FULL_NAME)
        .unwrap();
    full_name.set(&mut c, Value::from("Ada Lovelace")).unwrap();
    assert_eq!(c.full_name, "Ada Lovelace");
    assert_eq!(full_name.get(&c), Value::Text("Ada Lovelace".into()));
}

#[test]
fn rows_hydrate_case_insensitively() {
    let r = row(&[
        ("ID", Value::I32(7)),
        ("fullname", Value::from("Grace")),
        ("Email", Value::Null),
        ("visits", Value::I32(99)),
        ("unmapped", Value::from("ignored")),
    ]);
    let c: Customer = map_row(&r, &Customer::mapping()).unwrap();
    assert_eq!(
        c,
        Customer {
            id: 7,
            full_name: "Grace".into(),
            email: None,
            visits: 0,
            r#type: None,
        }
    );
}

#[test]
fn conversion_errors_name_the_column() {
    let r = row(&[("id", Value::from("not a number"))]);
    let err = RowMapper::<Customer>::new().map(&r).unwrap_err();
    assert!(err.is_conversion());
    assert!(err.to_string().contains("id"));
}

#[test]
fn insert_statement_from_derived_members() {
    let plan: ColumnPlan<Customer> = ColumnPlan::new(&["type"], Naming::Lowercase);
    assert_eq!(
        build_insert("customers", &plan, &["id"]),
        "INSERT INTO customers(id,fullname,email) SELECT @id,@fullname,@email \
         WHERE NOT EXISTS (SELECT 1 FROM customers t WHERE t.id = @id)"
    );
}

#[test]
fn entity_bound_as_parameters() {
    let c = Customer {
        id: 3,
        full_name: "Ada".into(),
        email: Some("ada@example.com".into()),
        visits: 5,
        r#type: None,
    };
    let mut command = Command::new("UPDATE customers SET email = @Email WHERE id = @ID");
    command.bind_params(&c);

    let (sql, values) = command.to_positional();
    assert_eq!(sql, "UPDATE customers SET email = $1 WHERE id = $2");
    assert_eq!(
        values,
        [&Value::Text("ada@example.com".into()), &Value::I32(3)]
    );
}
