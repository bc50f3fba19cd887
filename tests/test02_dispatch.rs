use std::error::Error;

use sql_embrace::error::rehome;
use sql_embrace::prelude::*;
use sql_embrace::test_utils::MockConnection;

fn users(rows: Vec<(i64, &str)>) -> MockConnection {
    MockConnection::new(PlaceholderStyle::Qmark).with_rows(
        &["id", "name"],
        rows.into_iter()
            .map(|(id, name)| vec![DbValue::Int(id), DbValue::from(name)]),
    )
}

#[test]
fn get_user_one_returns_the_row_unmapped() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("-- :name get_user :one\nSELECT id, name FROM users WHERE id = :id")?;
    assert_eq!(query.name(), Some("get_user"));
    assert_eq!(query.result_shape(), ResultShape::One);

    let mut conn = users(vec![(7, "Ada")]);
    let args = bind_args! { "id" => 7 };
    let row = query
        .bind(&mut conn)
        .args(&args)
        .one()?
        .into_row()
        .ok_or("expected a plain row")?;
    assert_eq!(row.values, vec![DbValue::Int(7), DbValue::Text("Ada".into())]);
    assert_eq!(row.get("name"), Some(&DbValue::Text("Ada".into())));

    assert_eq!(
        conn.executed,
        vec![(
            "SELECT id, name FROM users WHERE id = ?".to_string(),
            BindParams::Positional(vec![DbValue::Int(7)])
        )]
    );
    Ok(())
}

#[test]
fn one_enforces_cardinality() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM users")?;

    let mut conn = users(vec![]);
    let err = query.bind(&mut conn).one().err();
    assert!(matches!(err, Some(EmbraceError::NoResultFound)));

    let mut conn = users(vec![(1, "Ada"), (2, "Grace")]);
    let err = query.bind(&mut conn).one().err();
    assert!(matches!(err, Some(EmbraceError::MultipleResultsFound)));

    let mut conn = users(vec![(1, "Ada"), (2, "Grace")]);
    let err = query.bind(&mut conn).exactly_one().err();
    assert!(matches!(err, Some(EmbraceError::MultipleResultsFound)));
    Ok(())
}

#[test]
fn first_and_one_or_none() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM users")?;

    let mut conn = users(vec![]);
    assert!(query.bind(&mut conn).first()?.is_none());

    let mut conn = users(vec![(1, "Ada"), (2, "Grace")]);
    let first = query.bind(&mut conn).first()?.and_then(Fetched::into_row);
    assert_eq!(first.map(|row| row.values[0].clone()), Some(DbValue::Int(1)));

    let mut conn = users(vec![]);
    assert!(query.bind(&mut conn).one_or_none()?.is_none());

    let mut conn = users(vec![(1, "Ada"), (2, "Grace")]);
    let err = query.bind(&mut conn).one_or_none().err();
    assert!(matches!(err, Some(EmbraceError::MultipleResultsFound)));
    Ok(())
}

#[test]
fn many_streams_rows() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM users")?;
    let mut conn = users(vec![(1, "Ada"), (2, "Grace"), (3, "Edsger")]);
    let names = query
        .bind(&mut conn)
        .many()?
        .map(|row| -> Result<Option<DbValue>, Box<dyn Error>> {
            let row = row?.into_row().ok_or("expected a row")?;
            Ok(row.get("name").cloned())
        })
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        names,
        vec![
            Some(DbValue::from("Ada")),
            Some(DbValue::from("Grace")),
            Some(DbValue::from("Edsger"))
        ]
    );
    Ok(())
}

#[test]
fn scalar_and_column() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT name, id FROM users")?;

    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["name", "id"], [vec![DbValue::from("Ada"), DbValue::Int(1)]]);
    let value = query.bind(&mut conn).scalar()?.into_value();
    assert_eq!(value, Some(DbValue::from("Ada")));

    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(
        &["name", "id"],
        [
            vec![DbValue::from("Ada"), DbValue::Int(1)],
            vec![DbValue::from("Grace"), DbValue::Int(2)],
        ],
    );
    let names = query
        .bind(&mut conn)
        .column()?
        .map(|item| item.map(Fetched::into_value))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(names, vec![Some(DbValue::from("Ada")), Some(DbValue::from("Grace"))]);

    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(&["name"], Vec::<Vec<DbValue>>::new());
    assert!(query.bind(&mut conn).column()?.next().is_none());
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(&["name"], Vec::<Vec<DbValue>>::new());
    assert!(matches!(query.bind(&mut conn).scalar().err(), Some(EmbraceError::NoResultFound)));
    Ok(())
}

#[test]
fn scalar_with_mapping_maps_the_first_column() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT count(*) AS n, 'ignored' FROM users")?
        .returning(Returning::new().map(MapObject::passthrough()))?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["n", "x"], [vec![DbValue::Int(3), DbValue::from("ignored")]]);
    let count = query.bind(&mut conn).scalar()?.into_value();
    assert_eq!(count, Some(DbValue::Int(3)));
    Ok(())
}

#[test]
fn affected_and_cursor() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("-- :name touch :affected\nUPDATE users SET seen = 1")?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_affected(4);
    assert_eq!(query.bind(&mut conn).execute()?.into_affected()?, 4);

    let query = Query::from_sql("SELECT id, name FROM users")?;
    let mut conn = users(vec![(1, "Ada")]);
    let mut cursor = query.bind(&mut conn).cursor()?;
    assert_eq!(
        cursor.description().map(|names| names.as_ref().clone()),
        Some(vec!["id".to_string(), "name".to_string()])
    );
    assert!(cursor.fetch_one().map_err(rehome)?.is_some());
    assert!(cursor.fetch_one().map_err(rehome)?.is_none());
    Ok(())
}

#[test]
fn declared_shape_is_used_unless_overridden() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("-- :name ids :column\nSELECT id FROM users")?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["id"], [vec![DbValue::Int(1)], vec![DbValue::Int(2)]]);
    let ids = query.bind(&mut conn).execute()?.into_rows()?.count();
    assert_eq!(ids, 2);

    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["id"], [vec![DbValue::Int(1)], vec![DbValue::Int(2)]]);
    let outcome = query
        .bind(&mut conn)
        .options(ExecOptions::default().with_result(ResultShape::First))
        .execute()?;
    let first = outcome
        .into_fetched()?
        .and_then(Fetched::into_row)
        .map(|row| row.values[0].clone());
    assert_eq!(first, Some(DbValue::Int(1)));
    Ok(())
}

#[test]
fn statements_share_one_cursor_and_the_last_result_wins() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql(
        "-- :name add_user :one\nINSERT INTO users (name) VALUES (:name);\nSELECT id, name FROM users WHERE name = :name",
    )?;
    let mut conn = MockConnection::new(PlaceholderStyle::Named)
        .with_affected(1)
        .with_rows(&["id", "name"], [vec![DbValue::Int(5), DbValue::from("Ada")]]);
    let args = bind_args! { "name" => "Ada" };
    let row = query.bind(&mut conn).args(&args).debug(true).execute()?.into_fetched()?;
    assert_eq!(row.and_then(Fetched::into_row).map(|r| r.values[0].clone()), Some(DbValue::Int(5)));
    assert_eq!(
        conn.executed_sql(),
        vec![
            "INSERT INTO users (name) VALUES (:name)",
            "SELECT id, name FROM users WHERE name = :name"
        ]
    );
    Ok(())
}

#[test]
fn unknown_paramstyle_fails_before_execution() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT 1")?;
    let mut conn = MockConnection::default();
    let err = query.bind(&mut conn).many().err();
    assert!(matches!(err, Some(EmbraceError::UnknownParamStyle(name)) if name.ends_with("MockConnection")));
    Ok(())
}

#[test]
fn mismatched_outcome_is_an_error() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("UPDATE t SET a = 1")?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_affected(1);
    let outcome = query
        .bind(&mut conn)
        .options(ExecOptions::default().with_result(ResultShape::Affected))
        .execute()?;
    assert!(matches!(
        outcome.into_rows().err(),
        Some(EmbraceError::UnsupportedResultShape(_))
    ));
    Ok(())
}

#[test]
fn mapped_many_without_description_is_an_error() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("UPDATE users SET seen = 1")?
        .returning(Returning::new().map(MapObject::dict()))?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_affected(3);
    let err = query.bind(&mut conn).many().err();
    assert!(matches!(err, Some(EmbraceError::Mapping(_))));
    Ok(())
}
