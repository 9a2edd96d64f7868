//! Storage abstraction for Threadline.
//!
//! The [`Store`] trait is the record store for articles and comments. It
//! is the only writer of both collections and enforces the referential
//! invariants on every write:
//!
//! 1. every comment's article exists;
//! 2. a reply's parent exists and belongs to the same article;
//! 3. parent links form a forest (follows from 2, since a parent must
//!    exist before its reply is created);
//! 4. ids are unique per collection;
//! 5. replies nest at most [`MAX_THREAD_DEPTH`](crate::thread::MAX_THREAD_DEPTH) levels.
//!
//! Implementations must be `Send + Sync`, serialize their writes, and
//! never expose a partially written record to readers. Callers share one
//! store as `Arc<dyn Store>`.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Article, ArticleSummary, Comment, NewArticle, NewComment};

/// Abstract record store for articles and comments.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_articles`](Store::list_articles) | Summaries of every article |
/// | [`get_article`](Store::get_article) | One full article |
/// | [`comments_for_article`](Store::comments_for_article) | All comments of an article, creation order |
/// | [`get_comment`](Store::get_comment) | One comment, scoped to its article |
/// | [`create_comment`](Store::create_comment) | Validate references, assign id, persist |
/// | [`create_article`](Store::create_article) | Administrative write path |
/// | [`create_articles`](Store::create_articles) | Seeding: all articles or none |
#[async_trait]
pub trait Store: Send + Sync {
    /// Summaries of every article, in insertion order.
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>>;

    /// Fetch one article. [`Error::NotFound`](crate::Error::NotFound) if absent.
    async fn get_article(&self, id: &str) -> Result<Article>;

    /// All comments on an article, in creation order.
    ///
    /// Fails with `NotFound` when the article itself does not exist, so
    /// callers can tell a missing article from one without comments.
    async fn comments_for_article(&self, article_id: &str) -> Result<Vec<Comment>>;

    /// Fetch a comment that belongs to `article_id`.
    async fn get_comment(&self, article_id: &str, comment_id: &str) -> Result<Comment>;

    /// Create a comment or reply. Nothing is written on error.
    async fn create_comment(&self, input: NewComment) -> Result<Comment>;

    /// Create an article, using the supplied id if there is one.
    async fn create_article(&self, input: NewArticle) -> Result<Article>;

    /// Create several articles in one write. If any article is invalid or
    /// its id is taken (by the store or an earlier article of the batch),
    /// nothing is written.
    async fn create_articles(&self, inputs: Vec<NewArticle>) -> Result<Vec<Article>>;

    async fn count_articles(&self) -> Result<usize>;

    async fn count_comments(&self) -> Result<usize>;
}
