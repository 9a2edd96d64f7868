//! Article and comment records, plus the projections served to readers.
//!
//! Field names on the wire are camelCase (`articleId`,
//! `commentOnCommentWithId`) to match the JSON API.

use serde::{Deserialize, Serialize};

/// A published article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Optional summary. `None` is distinct from `Some("")`.
    pub lead: Option<String>,
    pub body: String,
}

/// The `{id, title, lead}` projection used for article listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub lead: Option<String>,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            lead: article.lead.clone(),
        }
    }
}

/// A reader comment on an article, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub article_id: String,
    /// Parent comment, or `None` for a top-level comment.
    #[serde(rename = "commentOnCommentWithId")]
    pub parent_id: Option<String>,
    pub username: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Input for [`Store::create_comment`](crate::store::Store::create_comment).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    pub article_id: String,
    pub text: String,
    pub username: Option<String>,
    pub parent_id: Option<String>,
}

/// Input for [`Store::create_article`](crate::store::Store::create_article).
///
/// `id` is only supplied by the seeding process; otherwise the store
/// generates one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArticle {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub lead: Option<String>,
    pub body: String,
}

/// A comment with its hierarchy stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatComment {
    pub id: String,
    pub username: String,
    pub text: String,
}

impl From<&Comment> for FlatComment {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            username: comment.username.clone(),
            text: comment.text.clone(),
        }
    }
}

/// A comment together with its (recursively expanded) replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    pub id: String,
    pub username: String,
    pub text: String,
    pub replies: Vec<CommentNode>,
}

impl Drop for CommentNode {
    // Flatten the subtree onto a heap stack so dropping a deep chain does
    // not recurse once per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comment_wire_names() {
        let c = Comment {
            id: "c1".to_string(),
            article_id: "a1".to_string(),
            parent_id: None,
            username: "Guest user".to_string(),
            text: "hi".to_string(),
            created_at: 5,
        };
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({
                "id": "c1",
                "articleId": "a1",
                "commentOnCommentWithId": null,
                "username": "Guest user",
                "text": "hi",
                "createdAt": 5
            })
        );
    }

    #[test]
    fn test_absent_lead_serializes_as_null() {
        let a = Article {
            id: "a".to_string(),
            title: "T".to_string(),
            lead: None,
            body: "B".to_string(),
        };
        let summary = ArticleSummary::from(&a);
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({ "id": "a", "title": "T", "lead": null })
        );
    }

    #[test]
    fn test_dropping_deep_tree() {
        let leaf = |id: String, replies| CommentNode {
            id,
            username: "u".to_string(),
            text: "t".to_string(),
            replies,
        };
        let mut node = leaf("n0".to_string(), Vec::new());
        for i in 1..100_000 {
            node = leaf(format!("n{}", i), vec![node]);
        }
        drop(node);
    }

    #[test]
    fn test_new_article_optional_fields() {
        let input: NewArticle =
            serde_json::from_value(json!({ "title": "T", "body": "B" })).unwrap();
        assert_eq!(input.id, None);
        assert_eq!(input.lead, None);
    }
}
