use std::error::Error;

use sql_embrace::prelude::*;
use sql_embrace::test_utils::MockConnection;

#[derive(Debug)]
struct Author {
    id: i64,
    name: String,
    books: Vec<Hydrated>,
}

impl FromColumns for Author {
    fn from_columns(args: Args<'_>) -> Result<Self, EmbraceError> {
        Ok(Author {
            id: args.require("id")?.as_int().copied().unwrap_or_default(),
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

#[derive(Debug)]
struct Book {
    title: String,
}

impl FromColumns for Book {
    fn from_columns(args: Args<'_>) -> Result<Self, EmbraceError> {
        Ok(Book {
            title: args.require("title")?.as_text().unwrap_or_default().to_string(),
        })
    }
}

impl Entity for Book {}

fn int(v: i64) -> DbValue {
    DbValue::Int(v)
}

fn text(v: &str) -> DbValue {
    DbValue::from(v)
}

fn author_books(rows: Vec<Vec<DbValue>>) -> MockConnection {
    MockConnection::new(PlaceholderStyle::Qmark).with_rows(&["id", "name", "id", "title"], rows)
}

fn authors_query(returning: Returning) -> Result<Query, EmbraceError> {
    Query::from_sql(
        "SELECT a.id, a.name, b.id, b.title FROM authors a LEFT JOIN books b ON b.author_id = a.id ORDER BY a.id",
    )?
    .returning(returning)
}

fn titles(author: &Hydrated) -> Vec<String> {
    author
        .downcast_ref::<Author>()
        .map(|author| {
            author
                .books
                .iter()
                .filter_map(|book| book.downcast_ref::<Book>().map(|b| b.title.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn collect(rows: MappedRows<'_>) -> Result<Vec<Hydrated>, Box<dyn Error>> {
    rows.map(|item| -> Result<Hydrated, Box<dyn Error>> {
        Ok(item?.into_object().ok_or("expected one object per item")?)
    })
    .collect()
}

#[test]
fn declared_key_preserves_identity() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM authors")?
        .returning(Returning::new().map(MapObject::of::<Author>().key(["id"])))?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["id", "name"], [vec![int(1), text("Ada")], vec![int(1), text("Ada L.")]]);
    let authors = collect(query.bind(&mut conn).many()?)?;
    assert_eq!(authors.len(), 2);
    assert!(authors[0].ptr_eq(&authors[1]));
    let first = authors[0].downcast_ref::<Author>().ok_or("not an Author")?;
    assert_eq!(first.name, "Ada");
    Ok(())
}

#[test]
fn single_group_without_key_builds_fresh_objects() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM authors")?
        .returning(Returning::of::<Author>())?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["id", "name"], [vec![int(1), text("Ada")], vec![int(1), text("Ada")]]);
    let authors = collect(query.bind(&mut conn).many()?)?;
    assert!(!authors[0].ptr_eq(&authors[1]));
    Ok(())
}

#[test]
fn one_to_many_collects_children_in_row_order() -> Result<(), Box<dyn Error>> {
    let query = authors_query(
        Returning::new()
            .map(MapObject::of::<Author>().key(["id"]))
            .map(MapObject::of::<Book>())
            .join(one_to_many("Author", "books", "Book")),
    )?;
    let mut conn = author_books(vec![
        vec![int(1), text("Ada"), int(10), text("C1")],
        vec![int(1), text("Ada"), int(11), text("C2")],
        vec![int(1), text("Ada"), int(12), text("C3")],
        vec![int(2), text("Bob"), DbValue::Null, DbValue::Null],
    ]);
    let authors = collect(query.bind(&mut conn).many()?)?;
    assert_eq!(authors.len(), 2);
    assert_eq!(titles(&authors[0]), vec!["C1", "C2", "C3"]);

    let bob = authors[1].downcast_ref::<Author>().ok_or("not an Author")?;
    assert_eq!(bob.id, 2);
    assert!(bob.books.is_empty());
    Ok(())
}

#[test]
fn outer_joined_records_get_an_empty_list() -> Result<(), Box<dyn Error>> {
    let query = authors_query(
        Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict())
            .join(one_to_many(0, "books", 1)),
    )?;
    let mut conn = author_books(vec![vec![int(2), text("Bob"), DbValue::Null, DbValue::Null]]);
    let authors = collect(query.bind(&mut conn).many()?)?;
    assert_eq!(authors.len(), 1);
    let record = authors[0].as_record().ok_or("not a record")?;
    assert_eq!(record.children("books").map(<[Hydrated]>::len), Some(0));
    assert_eq!(record.value("name"), Some(&text("Bob")));
    Ok(())
}

#[test]
fn interleaved_parents_are_emitted_in_fragments() -> Result<(), Box<dyn Error>> {
    // Rows of author 1 are split by a row of author 2, so author 1 comes out twice,
    // each time holding only the books of its own run of rows.
    let query = authors_query(
        Returning::new()
            .map(MapObject::of::<Author>())
            .map(MapObject::of::<Book>())
            .join(one_to_many("Author", "books", "Book")),
    )?;
    let mut conn = author_books(vec![
        vec![int(1), text("Ada"), int(10), text("C1")],
        vec![int(2), text("Bob"), int(20), text("D1")],
        vec![int(1), text("Ada"), int(11), text("C2")],
    ]);
    let authors = collect(query.bind(&mut conn).many()?)?;
    assert_eq!(authors.len(), 3);
    assert_eq!(titles(&authors[0]), vec!["C1"]);
    assert_eq!(titles(&authors[1]), vec!["D1"]);
    assert_eq!(titles(&authors[2]), vec!["C2"]);
    assert!(!authors[0].ptr_eq(&authors[2]));
    Ok(())
}

#[test]
fn contiguity_validation_rejects_interleaved_parents() -> Result<(), Box<dyn Error>> {
    let query = authors_query(
        Returning::new()
            .map(MapObject::of::<Author>())
            .map(MapObject::of::<Book>())
            .join(one_to_many("Author", "books", "Book"))
            .validate_contiguity(true),
    )?;
    let mut conn = author_books(vec![
        vec![int(1), text("Ada"), int(10), text("C1")],
        vec![int(2), text("Bob"), int(20), text("D1")],
        vec![int(1), text("Ada"), int(11), text("C2")],
    ]);
    let items: Vec<_> = query.bind(&mut conn).many()?.collect();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[1].is_ok());
    assert!(matches!(
        items[2],
        Err(EmbraceError::ContiguityViolation { group: 0, row: 2 })
    ));
    Ok(())
}

#[test]
fn one_to_one_attaches_the_related_object() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT b.id, b.title, a.id, a.name FROM books b JOIN authors a")?
        .returning(
            Returning::new()
                .map(MapObject::dict().label("book"))
                .map(MapObject::dict().label("author").key(["id"]))
                .join(one_to_one("book", "author", "author")),
        )?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(
        &["id", "title", "id", "name"],
        [
            vec![int(10), text("C1"), int(1), text("Ada")],
            vec![int(11), text("C2"), int(1), text("Ada")],
        ],
    );
    let books = collect(query.bind(&mut conn).many()?)?;
    assert_eq!(books.len(), 2);
    let first = books[0].as_record().ok_or("not a record")?;
    let second = books[1].as_record().ok_or("not a record")?;
    let (Some(a), Some(b)) = (first.related("author"), second.related("author")) else {
        return Err("author not attached".into());
    };
    assert!(a.ptr_eq(b));
    Ok(())
}

#[test]
fn tuples_without_joins() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT a.id, a.name, b.book_id, b.title FROM authors a, books b")?
        .returning(
            Returning::new()
                .factory(|args| Ok(Hydrated::map(Record::from_args(args))))
                .factory(|args| Ok(Hydrated::map(Record::from_args(args))))
                .split_on(["book_id"]),
        )?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(
        &["id", "name", "book_id", "title"],
        [vec![int(1), text("Ada"), int(10), text("C1")]],
    );
    let row = query.bind(&mut conn).one()?.into_objects().ok_or("expected a tuple")?;
    assert_eq!(row.len(), 2);
    let book = row[1].as_record().ok_or("not a record")?;
    assert_eq!(book.value("book_id"), Some(&int(10)));
    assert_eq!(book.value("name"), None);
    Ok(())
}

#[test]
fn returning_is_validated_when_declared() {
    let query = Query::from_sql("SELECT 1").unwrap_or_else(|e| panic!("{e}"));
    let no_groups = query.returning(Returning::new());
    assert!(matches!(no_groups, Err(EmbraceError::Config(_))));

    let mixed = query.returning(
        Returning::new()
            .map(MapObject::dict())
            .factory(|args| Ok(Hydrated::map(Record::from_args(args))))
            .split_on(["x"]),
    );
    assert!(matches!(mixed, Err(EmbraceError::Config(_))));

    let single_join = query.returning(Returning::new().map(MapObject::dict()).join(one_to_one(0, "x", 0)));
    assert!(matches!(single_join, Err(EmbraceError::Config(_))));

    let bad_label = query.returning(
        Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict())
            .join(one_to_many("nobody", "xs", 1)),
    );
    assert!(matches!(bad_label, Err(EmbraceError::Config(_))));
}

#[test]
fn missing_split_column_is_reported() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql("SELECT id, name FROM authors")?.returning(
        Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict().split("book_id")),
    )?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark)
        .with_rows(&["id", "name"], [vec![int(1), text("Ada")]]);
    let err = query.bind(&mut conn).many().err();
    assert!(matches!(
        err,
        Some(EmbraceError::SplitColumnNotFound { group: 1, ref split, .. }) if split == "book_id"
    ));
    Ok(())
}

#[test]
fn consecutive_childless_parents_under_nested_joins() -> Result<(), Box<dyn Error>> {
    let query = Query::from_sql(
        "SELECT a.id, b.id, c.id FROM authors a \
         LEFT JOIN books b ON b.author_id = a.id \
         LEFT JOIN chapters c ON c.book_id = b.id ORDER BY a.id, b.id",
    )?
    .returning(
        Returning::new()
            .map(MapObject::dict().label("author").key(["id"]))
            .map(MapObject::dict().label("book").key(["id"]))
            .map(MapObject::dict().label("chapter"))
            .join(one_to_many("author", "books", "book"))
            .join(one_to_many("book", "chapters", "chapter")),
    )?;
    let mut conn = MockConnection::new(PlaceholderStyle::Qmark).with_rows(
        &["id", "id", "id"],
        [
            vec![int(1), DbValue::Null, DbValue::Null],
            vec![int(2), DbValue::Null, DbValue::Null],
            vec![int(3), int(30), int(300)],
        ],
    );
    let authors = collect(query.bind(&mut conn).many()?)?;
    let ids: Vec<Option<DbValue>> = authors
        .iter()
        .map(|author| author.as_record().and_then(|r| r.value("id").cloned()))
        .collect();
    assert_eq!(ids, vec![Some(int(1)), Some(int(2)), Some(int(3))]);

    let first = authors[0].as_record().ok_or("not a record")?;
    assert_eq!(first.children("books").map(<[Hydrated]>::len), Some(0));
    let last = authors[2].as_record().ok_or("not a record")?;
    let books = last.children("books").ok_or("books not attached")?;
    assert_eq!(books.len(), 1);
    let book = books[0].as_record().ok_or("not a record")?;
    assert_eq!(book.children("chapters").map(<[Hydrated]>::len), Some(1));
    Ok(())
}
