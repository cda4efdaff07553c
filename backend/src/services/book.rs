//! Book catalogue operations. Every book references a live author.

use validator::Validate;

use crate::error::AppError;
use crate::models::book::{Book, BookChanges, BookWithAuthor, CreateBook, NewBook, UpdateBook};
use crate::models::pagination::{Page, PageOptions};
use crate::models::user::User;
use crate::repositories::criteria::Criteria;
use crate::repositories::repository::{RecordStore, UpdateResult};
use crate::services::resource::ResourceService;
use crate::types::{BookId, UserId};

pub struct BookService<B, U> {
    books: ResourceService<Book, B>,
    users: ResourceService<User, U>,
}

impl<B: Clone, U: Clone> Clone for BookService<B, U> {
    fn clone(&self) -> Self {
        Self {
            books: self.books.clone(),
            users: self.users.clone(),
        }
    }
}

impl<B, U> BookService<B, U>
where
    B: RecordStore<Book>,
    U: RecordStore<User, Conn = B::Conn>,
{
    pub fn new(books: B, users: U) -> Self {
        Self {
            books: ResourceService::new(books),
            users: ResourceService::new(users),
        }
    }

    async fn require_author(&self, conn: &mut B::Conn, author_id: UserId) -> Result<User, AppError> {
        self.users
            .find_by_id(conn, author_id)
            .await?
            .ok_or_else(|| AppError::ReferenceNotFound("author not found".into()))
    }

    /// Adds a book after checking that its author exists and is live.
    pub async fn create_book(
        &self,
        conn: &mut B::Conn,
        payload: CreateBook,
        created_by: Option<UserId>,
    ) -> Result<Book, AppError> {
        payload.validate()?;
        let author = self.require_author(conn, payload.author_id).await?;

        self.books
            .create_record(
                conn,
                NewBook {
                    name: payload.name.trim().to_string(),
                    author_id: author.id,
                    created_by,
                },
            )
            .await
    }

    pub async fn get_book_by_id(
        &self,
        conn: &mut B::Conn,
        id: BookId,
    ) -> Result<Option<Book>, AppError> {
        self.books.find_by_id(conn, id).await
    }

    /// The book and its author. The author is `None` once soft-deleted.
    pub async fn get_book_with_author(
        &self,
        conn: &mut B::Conn,
        id: BookId,
    ) -> Result<Option<BookWithAuthor>, AppError> {
        let Some(book) = self.books.find_by_id(conn, id).await? else {
            return Ok(None);
        };
        let author = self.users.find_by_id(conn, book.author_id).await?;
        Ok(Some(BookWithAuthor { book, author }))
    }

    pub async fn get_books(
        &self,
        conn: &mut B::Conn,
        options: &PageOptions,
    ) -> Result<Page<Book>, AppError> {
        self.books.paginate(conn, Criteria::new(), options).await
    }

    pub async fn update_book_by_id(
        &self,
        conn: &mut B::Conn,
        id: BookId,
        payload: UpdateBook,
        modified_by: UserId,
    ) -> Result<UpdateResult, AppError> {
        payload.validate()?;
        if let Some(author_id) = payload.author_id {
            self.require_author(conn, author_id).await?;
        }

        let changes = BookChanges {
            name: payload.name.map(|name| name.trim().to_string()),
            author_id: payload.author_id,
            modified_by: Some(modified_by),
        };
        self.books.update_by_id(conn, id, changes).await
    }

    pub async fn delete_book(
        &self,
        conn: &mut B::Conn,
        id: BookId,
    ) -> Result<UpdateResult, AppError> {
        self.books.delete_by_id(conn, id).await
    }

    pub async fn restore_book(
        &self,
        conn: &mut B::Conn,
        id: BookId,
    ) -> Result<UpdateResult, AppError> {
        self.books.restore_by_id(conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::RecordMeta;
    use crate::models::user::{LoginProvider, UserRole};
    use crate::repositories::repository::MockRecordStore;
    use chrono::Utc;

    fn meta() -> RecordMeta {
        let now = Utc::now();
        RecordMeta {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn author(id: UserId) -> User {
        User {
            id,
            first_name: "Frank".into(),
            last_name: "Herbert".into(),
            email: "frank@example.com".into(),
            password: None,
            contact_no: None,
            role: UserRole::User,
            provider: LoginProvider::Otp,
            profile_url: None,
            last_login: None,
            created_by: None,
            modified_by: None,
            meta: meta(),
        }
    }

    fn stored(draft: NewBook) -> Book {
        Book {
            id: BookId::new(),
            name: draft.name,
            author_id: draft.author_id,
            created_by: draft.created_by,
            modified_by: None,
            meta: meta(),
        }
    }

    #[tokio::test]
    async fn create_book_requires_a_live_author() {
        let mut books = MockRecordStore::<Book>::new();
        books.expect_create().never();
        let mut users = MockRecordStore::<User>::new();
        users.expect_find_by_id().times(1).returning(|_, _, _| Ok(None));

        let service = BookService::new(books, users);
        let err = service
            .create_book(
                &mut (),
                CreateBook {
                    name: "Dune".into(),
                    author_id: UserId::new(),
                },
                None,
            )
            .await
            .expect_err("missing author");
        assert!(matches!(err, AppError::ReferenceNotFound(_)));
    }

    #[tokio::test]
    async fn create_book_records_author_and_creator() {
        let author_id = UserId::new();
        let creator = UserId::new();

        let mut users = MockRecordStore::<User>::new();
        users
            .expect_find_by_id()
            .withf(move |_, id, _| *id == author_id)
            .returning(|_, id, _| Ok(Some(author(id))));
        let mut books = MockRecordStore::<Book>::new();
        books
            .expect_create()
            .times(1)
            .returning(|_, draft| Ok(stored(draft)));

        let service = BookService::new(books, users);
        let book = service
            .create_book(
                &mut (),
                CreateBook {
                    name: " Dune ".into(),
                    author_id,
                },
                Some(creator),
            )
            .await
            .expect("create book");

        assert_eq!(book.name, "Dune");
        assert_eq!(book.author_id, author_id);
        assert_eq!(book.created_by, Some(creator));
    }

    #[tokio::test]
    async fn book_with_deleted_author_has_no_author() {
        let mut books = MockRecordStore::<Book>::new();
        books.expect_find_by_id().returning(|_, _, _| {
            Ok(Some(stored(NewBook {
                name: "Dune".into(),
                author_id: UserId::new(),
                created_by: None,
            })))
        });
        let mut users = MockRecordStore::<User>::new();
        users.expect_find_by_id().returning(|_, _, _| Ok(None));

        let service = BookService::new(books, users);
        let found = service
            .get_book_with_author(&mut (), BookId::new())
            .await
            .expect("lookup")
            .expect("book exists");
        assert!(found.author.is_none());
        assert_eq!(found.book.name, "Dune");
    }

    #[tokio::test]
    async fn update_records_the_editor() {
        let editor = UserId::new();
        let mut books = MockRecordStore::<Book>::new();
        books
            .expect_update_many()
            .withf(move |_, _, changes| {
                changes.modified_by == Some(editor) && changes.name.as_deref() == Some("Dune")
            })
            .returning(|_, _, _| Ok(UpdateResult::new(1)));
        let mut users = MockRecordStore::<User>::new();
        users.expect_find_by_id().never();

        let service = BookService::new(books, users);
        let result = service
            .update_book_by_id(
                &mut (),
                BookId::new(),
                UpdateBook {
                    name: Some("Dune ".into()),
                    author_id: None,
                },
                editor,
            )
            .await
            .expect("update");
        assert_eq!(result.matched, 1);
    }
}
