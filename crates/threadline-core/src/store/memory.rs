//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Both collections live behind one `std::sync::RwLock`. Every write
//! validates references, allocates an id, and inserts while holding the
//! write guard, so concurrent creates cannot lose each other's inserts
//! and readers never see a half-written record.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::id::{self, IdSource};
use crate::models::{Article, ArticleSummary, Comment, NewArticle, NewComment};
use crate::thread::{check_reply_depth, MAX_THREAD_DEPTH};
use crate::validate::{validate_article, validate_comment, ValidArticle};

use super::Store;

#[derive(Default)]
struct Collections {
    articles: Vec<Article>,
    article_index: HashMap<String, usize>,
    comments: Vec<Comment>,
    comment_index: HashMap<String, usize>,
}

impl Collections {
    fn article(&self, id: &str) -> Option<&Article> {
        self.article_index.get(id).map(|&i| &self.articles[i])
    }

    fn comment(&self, id: &str) -> Option<&Comment> {
        self.comment_index.get(id).map(|&i| &self.comments[i])
    }

    /// Nesting depth of an existing comment, capped just past the limit.
    fn depth_of(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut cur = Some(id);
        while let Some(comment_id) = cur {
            depth += 1;
            if depth > MAX_THREAD_DEPTH {
                break;
            }
            cur = self.comment(comment_id).and_then(|c| c.parent_id.as_deref());
        }
        depth
    }

    /// Pick the id for a validated article. `batch` holds ids claimed by
    /// earlier articles of the same write.
    fn article_id_for(
        &self,
        source: &IdSource,
        valid: &ValidArticle,
        batch: &HashSet<String>,
    ) -> Result<String> {
        match valid.id {
            Some(ref id) if self.article_index.contains_key(id) || batch.contains(id) => {
                Err(Error::Conflict(format!("article id {} already exists", id)))
            }
            Some(ref id) => Ok(id.clone()),
            None => id::allocate("article", id::candidates(source), |candidate| {
                self.article_index.contains_key(candidate) || batch.contains(candidate)
            }),
        }
    }
}

/// In-memory store for tests and embedding.
pub struct InMemoryStore {
    inner: RwLock<Collections>,
    id_source: IdSource,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
            id_source: id::default_source(),
        }
    }

    /// Replace the generator of new article and comment ids.
    pub fn with_id_source(mut self, source: IdSource) -> Self {
        self.id_source = source;
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| Error::Backend(anyhow!("in-memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| Error::Backend(anyhow!("in-memory store lock poisoned")))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>> {
        let inner = self.read()?;
        Ok(inner.articles.iter().map(ArticleSummary::from).collect())
    }

    async fn get_article(&self, id: &str) -> Result<Article> {
        let inner = self.read()?;
        inner
            .article(id)
            .cloned()
            .ok_or_else(|| Error::article_not_found(id))
    }

    async fn comments_for_article(&self, article_id: &str) -> Result<Vec<Comment>> {
        let inner = self.read()?;
        if inner.article(article_id).is_none() {
            return Err(Error::article_not_found(article_id));
        }
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect())
    }

    async fn get_comment(&self, article_id: &str, comment_id: &str) -> Result<Comment> {
        let inner = self.read()?;
        inner
            .comment(comment_id)
            .filter(|c| c.article_id == article_id)
            .cloned()
            .ok_or_else(|| Error::comment_not_found(comment_id))
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment> {
        let valid = validate_comment(input)?;
        let mut inner = self.write()?;

        if inner.article(&valid.article_id).is_none() {
            return Err(Error::article_not_found(&valid.article_id));
        }
        if let Some(ref parent_id) = valid.parent_id {
            let parent = inner
                .comment(parent_id)
                .ok_or_else(|| Error::comment_not_found(parent_id))?;
            if parent.article_id != valid.article_id {
                return Err(Error::InvalidArgument(format!(
                    "comment {} belongs to a different article",
                    parent_id
                )));
            }
            check_reply_depth(inner.depth_of(parent_id))?;
        }

        let id = id::allocate("comment", id::candidates(&self.id_source), |candidate| {
            inner.comment_index.contains_key(candidate)
        })?;

        let comment = Comment {
            id: id.clone(),
            article_id: valid.article_id,
            parent_id: valid.parent_id,
            username: valid.username,
            text: valid.text,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let index = inner.comments.len();
        inner.comments.push(comment.clone());
        inner.comment_index.insert(id, index);
        Ok(comment)
    }

    async fn create_article(&self, input: NewArticle) -> Result<Article> {
        let mut created = self.create_articles(vec![input]).await?;
        created
            .pop()
            .ok_or_else(|| Error::Backend(anyhow!("article batch came back empty")))
    }

    async fn create_articles(&self, inputs: Vec<NewArticle>) -> Result<Vec<Article>> {
        let valid = inputs
            .into_iter()
            .map(validate_article)
            .collect::<Result<Vec<_>>>()?;
        let mut inner = self.write()?;

        // Assign every id before inserting anything.
        let mut batch = HashSet::new();
        let mut articles = Vec::with_capacity(valid.len());
        for v in valid {
            let id = inner.article_id_for(&self.id_source, &v, &batch)?;
            batch.insert(id.clone());
            articles.push(Article {
                id,
                title: v.title,
                lead: v.lead,
                body: v.body,
            });
        }

        for article in &articles {
            let index = inner.articles.len();
            inner.articles.push(article.clone());
            inner.article_index.insert(article.id.clone(), index);
        }
        Ok(articles)
    }

    async fn count_articles(&self) -> Result<usize> {
        Ok(self.read()?.articles.len())
    }

    async fn count_comments(&self) -> Result<usize> {
        Ok(self.read()?.comments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::thread::to_nested_view;
    use crate::validate::DEFAULT_USERNAME;

    async fn store_with_article() -> (InMemoryStore, Article) {
        let store = InMemoryStore::new();
        let article = store
            .create_article(NewArticle {
                title: "Functional programming".to_string(),
                lead: Some("Why it matters".to_string()),
                body: "Pure functions all the way down.".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        (store, article)
    }

    fn new_comment(article_id: &str, text: &str, parent: Option<&str>) -> NewComment {
        NewComment {
            article_id: article_id.to_string(),
            text: text.to_string(),
            username: None,
            parent_id: parent.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (store, article) = store_with_article().await;

        let summaries = store.list_articles().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, article.id);
        assert_eq!(summaries[0].lead.as_deref(), Some("Why it matters"));

        let comment = store
            .create_comment(new_comment(&article.id, "first!", None))
            .await
            .unwrap();
        assert_eq!(comment.username, DEFAULT_USERNAME);
        assert_eq!(comment.parent_id, None);

        let fetched = store.get_comment(&article.id, &comment.id).await.unwrap();
        assert_eq!(fetched, comment);
    }

    #[tokio::test]
    async fn test_missing_article_vs_no_comments() {
        let (store, article) = store_with_article().await;
        assert!(store
            .comments_for_article(&article.id)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.comments_for_article("nope").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            store.get_article("nope").await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_comment_on_missing_article_leaves_store_unchanged() {
        let (store, _article) = store_with_article().await;
        let err = store
            .create_comment(new_comment("missing", "hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.count_comments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reply_across_articles_rejected() {
        let (store, first) = store_with_article().await;
        let second = store
            .create_article(NewArticle {
                title: "Other".to_string(),
                body: "Other body".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let on_first = store
            .create_comment(new_comment(&first.id, "on first", None))
            .await
            .unwrap();

        let err = store
            .create_comment(new_comment(&second.id, "sneaky", Some(&on_first.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
        assert_eq!(store.count_comments().await.unwrap(), 1);

        assert!(matches!(
            store.get_comment(&second.id, &on_first.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_reply_to_missing_parent_is_not_found() {
        let (store, article) = store_with_article().await;
        let err = store
            .create_comment(new_comment(&article.id, "reply", Some("ghost")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.count_comments().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comments_in_creation_order_build_thread() {
        let (store, article) = store_with_article().await;
        let c1 = store
            .create_comment(new_comment(&article.id, "one", None))
            .await
            .unwrap();
        let c2 = store
            .create_comment(new_comment(&article.id, "two", Some(&c1.id)))
            .await
            .unwrap();
        let c3 = store
            .create_comment(new_comment(&article.id, "three", Some(&c2.id)))
            .await
            .unwrap();

        let comments = store.comments_for_article(&article.id).await.unwrap();
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![c1.id.as_str(), c2.id.as_str(), c3.id.as_str()]);

        let tree = to_nested_view(&comments).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies[0].replies[0].id, c3.id);
    }

    #[tokio::test]
    async fn test_supplied_article_id_conflict() {
        let store = InMemoryStore::new();
        let input = NewArticle {
            id: Some("intro".to_string()),
            title: "Intro".to_string(),
            body: "Hello".to_string(),
            ..Default::default()
        };
        store.create_article(input.clone()).await.unwrap();
        assert!(matches!(
            store.create_article(input).await.unwrap_err(),
            Error::Conflict(_)
        ));
        assert_eq!(store.count_articles().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_lose_nothing() {
        let (store, article) = store_with_article().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                let article_id = article.id.clone();
                tokio::spawn(async move {
                    store
                        .create_comment(new_comment(&article_id, &format!("comment {}", i), None))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.count_comments().await.unwrap(), 64);
        assert_eq!(
            store.comments_for_article(&article.id).await.unwrap().len(),
            64
        );
    }

    #[tokio::test]
    async fn test_ten_thousand_comment_ids_unique() {
        let (store, article) = store_with_article().await;
        let mut ids = HashSet::new();
        for i in 0..10_000 {
            let c = store
                .create_comment(new_comment(&article.id, &format!("c{}", i), None))
                .await
                .unwrap();
            ids.insert(c.id);
        }
        assert_eq!(ids.len(), 10_000);
    }

    fn fixed_ids(ids: &[&str]) -> IdSource {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        let next = std::sync::atomic::AtomicUsize::new(0);
        Arc::new(move || {
            let i = next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ids[i.min(ids.len() - 1)].clone()
        })
    }

    async fn store_with_ids(ids: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new().with_id_source(fixed_ids(ids));
        store
            .create_article(NewArticle {
                id: Some("a1".to_string()),
                title: "T".to_string(),
                body: "B".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_colliding_id_is_regenerated() {
        let store = store_with_ids(&["dup", "dup", "fresh"]).await;
        let first = store
            .create_comment(new_comment("a1", "one", None))
            .await
            .unwrap();
        let second = store
            .create_comment(new_comment("a1", "two", None))
            .await
            .unwrap();
        assert_eq!(first.id, "dup");
        assert_eq!(second.id, "fresh");
    }

    #[tokio::test]
    async fn test_exhausted_ids_conflict_without_insert() {
        let store = store_with_ids(&["same"]).await;
        store
            .create_comment(new_comment("a1", "one", None))
            .await
            .unwrap();
        let err = store
            .create_comment(new_comment("a1", "two", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{:?}", err);
        assert_eq!(store.count_comments().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reply_depth_limit() {
        let (store, article) = store_with_article().await;
        let mut parent: Option<String> = None;
        for i in 0..MAX_THREAD_DEPTH {
            let c = store
                .create_comment(new_comment(&article.id, &format!("level {}", i), parent.as_deref()))
                .await
                .unwrap();
            parent = Some(c.id);
        }

        let err = store
            .create_comment(new_comment(&article.id, "too deep", parent.as_deref()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{:?}", err);
        assert_eq!(store.count_comments().await.unwrap(), MAX_THREAD_DEPTH);

        let comments = store.comments_for_article(&article.id).await.unwrap();
        assert!(to_nested_view(&comments).is_ok());
    }

    #[tokio::test]
    async fn test_create_articles_all_or_nothing() {
        let store = InMemoryStore::new();
        let article = |id: Option<&str>, title: &str| NewArticle {
            id: id.map(str::to_string),
            title: title.to_string(),
            body: "body".to_string(),
            ..Default::default()
        };

        let err = store
            .create_articles(vec![
                article(Some("same"), "A"),
                article(None, "B"),
                article(Some("same"), "C"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.count_articles().await.unwrap(), 0);

        let err = store
            .create_articles(vec![article(None, "ok"), article(None, " ")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(store.count_articles().await.unwrap(), 0);

        let created = store
            .create_articles(vec![article(Some("same"), "A"), article(None, "B")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].id, "same");
        let titles: Vec<String> = store
            .list_articles()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
