use super::*;
use crate::mock::{MockConnection, Person, row};
use crate::value::Value;

fn person(id: i32, name: &str) -> crate::reader::BufferedRow {
    row(&[("id", Value::I32(id)), ("name", Value::from(name))])
}

fn count(n: i64) -> crate::reader::BufferedRow {
    row(&[("count", Value::I64(n))])
}

#[tokio::test]
async fn query_many_maps_every_row() {
    let conn = MockConnection::new().returning_rows(vec![person(1, "Ada"), person(2, "Grace")]);
    let people: Vec<Person> = conn
        .query_many("SELECT id, name FROM person WHERE id > @id", &[("id", 0)])
        .await
        .unwrap();

    assert_eq!(people.len(), 2);
    assert_eq!(people[1].name, "Grace");
    assert_eq!(conn.released(), 1);

    let executed = conn.executed();
    assert_eq!(executed[0].parameters()[0].value, Value::I32(0));
}

#[tokio::test]
async fn query_many_releases_reader_on_conversion_error() {
    let bad = row(&[("id", Value::from("x"))]);
    let conn = MockConnection::new().returning_rows(vec![person(1, "Ada"), bad]);
    let err = conn
        .query_many::<Person, _>("SELECT * FROM person", &())
        .await
        .unwrap_err();
    assert!(err.is_conversion());
    assert_eq!(conn.released(), 1);
}

#[tokio::test]
async fn query_single_with_one_row() {
    let conn = MockConnection::new().returning_rows(vec![person(7, "Ada")]);
    let p: Person = conn.query_single("SELECT * FROM person", &()).await.unwrap();
    assert_eq!(p.id, 7);
}

#[tokio::test]
async fn query_single_without_rows_is_default() {
    let conn = MockConnection::new().returning_rows(vec![]);
    let p: Person = conn.query_single("SELECT * FROM person", &()).await.unwrap();
    assert_eq!(p, Person::default());
}

// Zero rows is tolerated but two rows is not.
#[tokio::test]
async fn query_single_with_two_rows_is_a_cardinality_error() {
    let conn = MockConnection::new().returning_rows(vec![person(1, "a"), person(2, "b"), person(3, "c")]);
    let err = conn
        .query_single::<Person, _>("SELECT * FROM person", &())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::TooManyRows { expected: 1, got: 2 }));
    assert_eq!(conn.released(), 1);
}

#[tokio::test]
async fn scalar_projection_bypasses_construction() {
    let conn = MockConnection::new().returning_rows(vec![count(42)]);
    let n: i64 = conn.query_single("SELECT count(*) FROM person", &()).await.unwrap();
    assert_eq!(n, 42);
}

#[tokio::test]
async fn nullable_scalar_projection() {
    let conn = MockConnection::new().returning_rows(vec![row(&[("max", Value::Null)])]);
    let max: Option<i32> = conn.query_single("SELECT max(age) FROM person", &()).await.unwrap();
    assert_eq!(max, None);
}

#[tokio::test]
async fn first_or_default_takes_first_row() {
    let conn = MockConnection::new().returning_rows(vec![person(1, "Ada"), person(2, "Grace")]);
    let p: Person = conn
        .query_first_or_default("SELECT * FROM person ORDER BY id", &())
        .await
        .unwrap();
    assert_eq!(p.name, "Ada");
    assert_eq!(conn.released(), 1);
}

#[tokio::test]
async fn first_or_default_on_empty_result() {
    let conn = MockConnection::new().returning_rows(vec![]);
    let p: Person = conn
        .query_first_or_default("SELECT * FROM person", &())
        .await
        .unwrap();
    assert_eq!(p, Person::default());

    let conn = MockConnection::new();
    let n: i64 = conn.query_first_or_default("SELECT 1", &()).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn execute_non_query_binds_entity_members() {
    let conn = MockConnection::new().affecting(1);
    let ada = Person {
        id: 1,
        name: "Ada".into(),
        ..Default::default()
    };
    let affected = conn
        .execute_non_query("UPDATE person SET name = @Name WHERE id = @Id", &ada)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let executed = conn.executed();
    let (sql, values) = executed[0].to_positional();
    assert_eq!(sql, "UPDATE person SET name = $1 WHERE id = $2");
    assert_eq!(values.len(), 2);
}

#[tokio::test]
async fn execution_errors_surface_unchanged() {
    let conn = MockConnection::new().failing(OrmError::Other("boom".into()));
    let err = conn
        .query_many::<Person, _>("SELECT * FROM person", &())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[tokio::test]
async fn batch_query_concatenates_result_sets() {
    let conn = MockConnection::new().returning(vec![
        vec![person(1, "a"), person(2, "b")],
        vec![],
        vec![row(&[("name", Value::from("c")), ("id", Value::I64(3))])],
    ]);
    let mut batch = Batch::new(&conn);
    batch
        .push(Command::new("SELECT id, name FROM person WHERE id < 3"))
        .push(Command::new("SELECT id, name FROM person WHERE false"))
        .push(Command::new("SELECT name, id::bigint AS id FROM person WHERE id = 3"));

    let people: Vec<Person> = batch.query_many().await.unwrap();
    let ids: Vec<_> = people.iter().map(|p| p.id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(people[2].name, "c");
    assert_eq!(conn.executed().len(), 3);
    assert_eq!(conn.released(), 1);
}

#[tokio::test]
async fn empty_batch_query_is_empty() {
    let conn = MockConnection::new();
    let batch = Batch::new(&conn);
    let people: Vec<Person> = batch.query_many().await.unwrap();
    assert!(people.is_empty());
    assert!(conn.executed().is_empty());
}
