//! SQLite-backed [`Store`] implementation.
//!
//! Reads go straight to the pool. Writes take an in-process mutex for one
//! logical operation and run inside a transaction that validates the
//! references, picks an unused id, inserts, and commits. A failed write
//! rolls back when the transaction is dropped, so nothing is persisted.

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use threadline_core::id::{self, IdSource};
use threadline_core::models::{Article, ArticleSummary, Comment, NewArticle, NewComment};
use threadline_core::store::Store;
use threadline_core::thread::{check_reply_depth, MAX_THREAD_DEPTH};
use threadline_core::validate::{validate_article, validate_comment, ValidArticle};
use threadline_core::{Error, Result};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    id_source: IdSource,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
            id_source: id::default_source(),
        }
    }

    /// Replace the generator of new article and comment ids.
    pub fn with_id_source(mut self, source: IdSource) -> Self {
        self.id_source = source;
        self
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    /// The underlying pool, for read-only reporting queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn article_from_row(row: &SqliteRow) -> Article {
    Article {
        id: row.get("id"),
        title: row.get("title"),
        lead: row.get("lead"),
        body: row.get("body"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        parent_id: row.get("parent_id"),
        username: row.get("username"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

async fn article_id_taken(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM articles WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("checking article id")?;
    Ok(taken)
}

async fn comment_id_taken(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM comments WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("checking comment id")?;
    Ok(taken)
}

/// Nesting depth of an existing comment, capped just past the limit.
async fn comment_depth(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<usize> {
    let depth: i64 = sqlx::query_scalar(
        r#"
        WITH RECURSIVE chain(id, parent_id, depth) AS (
            SELECT id, parent_id, 1 FROM comments WHERE id = ?
            UNION ALL
            SELECT c.id, c.parent_id, chain.depth + 1
            FROM comments c JOIN chain ON c.id = chain.parent_id
            WHERE chain.depth <= ?
        )
        SELECT COALESCE(MAX(depth), 0) FROM chain
        "#,
    )
    .bind(id)
    .bind(MAX_THREAD_DEPTH as i64)
    .fetch_one(&mut **tx)
    .await
    .context("measuring reply depth")?;
    Ok(depth as usize)
}

impl SqliteStore {
    /// Pick the id for a validated article inside the write transaction.
    /// `batch` holds ids claimed by earlier articles of the same write.
    async fn article_id_for(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        valid: &ValidArticle,
        batch: &HashSet<String>,
    ) -> Result<String> {
        if let Some(ref id) = valid.id {
            if batch.contains(id) || article_id_taken(tx, id).await? {
                return Err(Error::Conflict(format!("article id {} already exists", id)));
            }
            return Ok(id.clone());
        }

        for candidate in id::candidates(&self.id_source) {
            if !batch.contains(&candidate) && !article_id_taken(tx, &candidate).await? {
                return Ok(candidate);
            }
        }
        Err(id::exhausted("article"))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
        let rows = sqlx::query("SELECT id, title, lead FROM articles ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .context("listing articles")?;

        Ok(rows
            .iter()
            .map(|row| ArticleSummary {
                id: row.get("id"),
                title: row.get("title"),
                lead: row.get("lead"),
            })
            .collect())
    }

    async fn get_article(&self, id: &str) -> Result<Article> {
        let row = sqlx::query("SELECT id, title, lead, body FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("fetching article {}", id))?;

        row.as_ref()
            .map(article_from_row)
            .ok_or_else(|| Error::article_not_found(id))
    }

    async fn comments_for_article(&self, article_id: &str) -> Result<Vec<Comment>> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM articles WHERE id = ?")
            .bind(article_id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("checking article {}", article_id))?;
        if !exists {
            return Err(Error::article_not_found(article_id));
        }

        let rows = sqlx::query(
            "SELECT id, article_id, parent_id, username, text, created_at FROM comments WHERE article_id = ? ORDER BY seq",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("fetching comments for article {}", article_id))?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn get_comment(&self, article_id: &str, comment_id: &str) -> Result<Comment> {
        let row = sqlx::query(
            "SELECT id, article_id, parent_id, username, text, created_at FROM comments WHERE id = ? AND article_id = ?",
        )
        .bind(comment_id)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("fetching comment {}", comment_id))?;

        row.as_ref()
            .map(comment_from_row)
            .ok_or_else(|| Error::comment_not_found(comment_id))
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment> {
        let valid = validate_comment(input)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("beginning transaction")?;

        let article_exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM articles WHERE id = ?")
                .bind(&valid.article_id)
                .fetch_one(&mut *tx)
                .await
                .context("checking comment article")?;
        if !article_exists {
            return Err(Error::article_not_found(&valid.article_id));
        }

        if let Some(ref parent_id) = valid.parent_id {
            let parent_article: Option<String> =
                sqlx::query_scalar("SELECT article_id FROM comments WHERE id = ?")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("checking parent comment")?;
            match parent_article {
                None => return Err(Error::comment_not_found(parent_id)),
                Some(owner) if owner != valid.article_id => {
                    return Err(Error::InvalidArgument(format!(
                        "comment {} belongs to a different article",
                        parent_id
                    )))
                }
                Some(_) => {}
            }
            check_reply_depth(comment_depth(&mut tx, parent_id).await?)?;
        }

        let mut id = None;
        for candidate in id::candidates(&self.id_source) {
            if !comment_id_taken(&mut tx, &candidate).await? {
                id = Some(candidate);
                break;
            }
        }
        let id = id.ok_or_else(|| id::exhausted("comment"))?;

        let comment = Comment {
            id,
            article_id: valid.article_id,
            parent_id: valid.parent_id,
            username: valid.username,
            text: valid.text,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        sqlx::query(
            "INSERT INTO comments (id, article_id, parent_id, username, text, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.article_id)
        .bind(&comment.parent_id)
        .bind(&comment.username)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await
        .context("inserting comment")?;

        tx.commit().await.context("committing comment")?;

        tracing::info!(
            comment_id = %comment.id,
            article_id = %comment.article_id,
            reply_to = ?comment.parent_id,
            "comment created"
        );
        Ok(comment)
    }

    async fn create_article(&self, input: NewArticle) -> Result<Article> {
        let mut created = self.create_articles(vec![input]).await?;
        created
            .pop()
            .ok_or_else(|| Error::Backend(anyhow::anyhow!("article batch came back empty")))
    }

    async fn create_articles(&self, inputs: Vec<NewArticle>) -> Result<Vec<Article>> {
        let valid = inputs
            .into_iter()
            .map(validate_article)
            .collect::<Result<Vec<_>>>()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("beginning transaction")?;

        let mut batch = HashSet::new();
        let mut articles = Vec::with_capacity(valid.len());
        for v in valid {
            let id = self.article_id_for(&mut tx, &v, &batch).await?;
            batch.insert(id.clone());

            let article = Article {
                id,
                title: v.title,
                lead: v.lead,
                body: v.body,
            };
            sqlx::query(
                "INSERT INTO articles (id, title, lead, body, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&article.id)
            .bind(&article.title)
            .bind(&article.lead)
            .bind(&article.body)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await
            .context("inserting article")?;
            articles.push(article);
        }

        tx.commit().await.context("committing articles")?;

        for article in &articles {
            tracing::info!(article_id = %article.id, title = %article.title, "article created");
        }
        Ok(articles)
    }

    async fn count_articles(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .context("counting articles")?;
        Ok(n as usize)
    }

    async fn count_comments(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .context("counting comments")?;
        Ok(n as usize)
    }
}
