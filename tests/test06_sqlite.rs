#![cfg(feature = "sqlite")]

use std::error::Error;
use std::time::Duration;

use sql_embrace::prelude::*;

const SCHEMA: &str = "
-- :name create_schema :affected
CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE books (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors (id), title TEXT);

-- :name add_authors :affected
INSERT INTO authors (id, name) VALUES :t*:rows;

-- :name add_book :affected
INSERT INTO books (id, author_id, title) VALUES (:id, :author_id, :title);

-- :name author_count :scalar
SELECT count(*) FROM authors;

-- :name author_names :column
SELECT name FROM :i:table ORDER BY id;

-- :name authors_with_books :many
SELECT a.id, a.name, b.id, b.title
FROM authors a LEFT JOIN books b ON b.author_id = a.id
ORDER BY a.id, b.id;
";

#[derive(Debug)]
struct Author {
    name: String,
    books: Vec<Hydrated>,
}

impl FromColumns for Author {
    fn from_columns(args: Args<'_>) -> Result<Self, EmbraceError> {
        Ok(Author {
            name: args.require("name")?.as_text().unwrap_or_default().to_string(),
            books: Vec::new(),
        })
    }
}

impl Entity for Author {
    fn attach(&mut self, attr: &str, related: Attachment) -> Result<(), EmbraceError> {
        match (attr, related) {
            ("books", Attachment::Many(book)) => {
                self.books.extend(book);
                Ok(())
            }
            (other, _) => Err(EmbraceError::Mapping(format!("Author has no {other}"))),
        }
    }
}

fn setup() -> Result<(tempfile::TempDir, rusqlite::Connection, Queries), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("library.db");
    let mut conn = SqliteOptionsBuilder::new(path.to_string_lossy().into_owned())
        .busy_timeout(Duration::from_secs(1))
        .open()?;
    let queries = Queries::from_text(SCHEMA)?;
    queries
        .get("create_schema")
        .ok_or("missing create_schema")?
        .bind(&mut conn)
        .affected()?;
    Ok((dir, conn, queries))
}

fn query<'q>(queries: &'q Queries, name: &str) -> Result<&'q Query, Box<dyn Error>> {
    Ok(queries.get(name).ok_or_else(|| format!("missing query {name}"))?)
}

fn seed(conn: &mut rusqlite::Connection, queries: &Queries) -> Result<(), Box<dyn Error>> {
    let rows = bind_args! { "rows" => BindValue::rows([
        vec![DbValue::Int(1), DbValue::from("Ada")],
        vec![DbValue::Int(2), DbValue::from("Grace")],
    ]) };
    let inserted = query(queries, "add_authors")?.bind(conn).args(&rows).affected()?;
    assert_eq!(inserted, 2);

    for (id, author_id, title) in [(10, 1, "Notes"), (11, 1, "Sketch"), (12, 1, "Letters")] {
        let args = bind_args! { "id" => id, "author_id" => author_id, "title" => title };
        query(queries, "add_book")?.bind(conn).args(&args).affected()?;
    }
    Ok(())
}

#[test]
fn scalar_column_and_affected() -> Result<(), Box<dyn Error>> {
    let (_dir, mut conn, queries) = setup()?;
    seed(&mut conn, &queries)?;

    let count = query(&queries, "author_count")?.bind(&mut conn).scalar()?.into_value();
    assert_eq!(count, Some(DbValue::Int(2)));

    let args = bind_args! { "table" => "authors" };
    let names = query(&queries, "author_names")?
        .bind(&mut conn)
        .args(&args)
        .column()?
        .map(|name| name.map(Fetched::into_value))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(names, vec![Some(DbValue::from("Ada")), Some(DbValue::from("Grace"))]);
    Ok(())
}

#[test]
fn hydrates_authors_with_books() -> Result<(), Box<dyn Error>> {
    let (_dir, mut conn, queries) = setup()?;
    seed(&mut conn, &queries)?;

    let authors_query = query(&queries, "authors_with_books")?.returning(
        Returning::new()
            .map(MapObject::of::<Author>().key(["id"]))
            .map(MapObject::dict())
            .join(one_to_many(0, "books", 1)),
    )?;
    let authors = authors_query
        .bind(&mut conn)
        .many()?
        .map(|item| -> Result<Hydrated, Box<dyn Error>> {
            Ok(item?.into_object().ok_or("expected an author")?)
        })
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(authors.len(), 2);

    let ada = authors[0].downcast_ref::<Author>().ok_or("not an Author")?;
    assert_eq!(ada.name, "Ada");
    let titles: Vec<Option<DbValue>> = ada
        .books
        .iter()
        .map(|book| book.as_record().and_then(|r| r.value("title").cloned()))
        .collect();
    assert_eq!(
        titles,
        vec![
            Some(DbValue::from("Notes")),
            Some(DbValue::from("Sketch")),
            Some(DbValue::from("Letters"))
        ]
    );

    let grace = authors[1].downcast_ref::<Author>().ok_or("not an Author")?;
    assert!(grace.books.is_empty());
    Ok(())
}

#[test]
fn constraint_violation_is_an_integrity_error() -> Result<(), Box<dyn Error>> {
    let (_dir, mut conn, queries) = setup()?;
    seed(&mut conn, &queries)?;

    let args = bind_args! { "rows" => BindValue::rows([vec![DbValue::Int(1), DbValue::from("Ada again")]]) };
    let err = query(&queries, "add_authors")?
        .bind(&mut conn)
        .args(&args)
        .affected()
        .err()
        .ok_or("duplicate key should fail")?;
    assert_eq!(err.class(), Some(ErrorClass::IntegrityError));
    Ok(())
}

#[test]
fn placeholders_bind_in_template_order() -> Result<(), Box<dyn Error>> {
    let mut conn = SqliteOptions::new(":memory:".into()).with_wal(false).open()?;
    let query = Query::from_sql("SELECT :b - :a AS diff")?;
    let args = bind_args! { "a" => 2, "b" => 5 };
    let diff = query.bind(&mut conn).args(&args).scalar()?.into_value();
    assert_eq!(diff, Some(DbValue::Int(3)));
    Ok(())
}

#[test]
fn cursor_result_can_be_read_directly() -> Result<(), Box<dyn Error>> {
    let mut conn = SqliteOptions::new(":memory:".into()).with_wal(false).open()?;
    let query = Query::from_sql("-- :name pair :cursor\nSELECT 1 AS a, 'x' AS b UNION ALL SELECT 2, 'y'")?;
    let cursor = query.bind(&mut conn).execute()?.into_cursor()?;
    assert_eq!(cursor.remaining(), 2);
    assert_eq!(
        cursor.description().map(|names| names.as_ref().clone()),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    Ok(())
}
