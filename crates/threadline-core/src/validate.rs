//! Input validation shared by every [`Store`](crate::store::Store)
//! implementation.
//!
//! Validation is purely syntactic: it never looks at stored data, so a
//! store can run it before taking its write lock. Reference checks
//! (article exists, parent on the same article) happen inside the store.

use crate::error::{Error, Result};
use crate::id::is_valid_id;
use crate::models::{NewArticle, NewComment};

/// Username given to comments that do not supply one.
pub const DEFAULT_USERNAME: &str = "Guest user";

/// A [`NewComment`] that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidComment {
    pub article_id: String,
    pub text: String,
    pub username: String,
    pub parent_id: Option<String>,
}

/// A [`NewArticle`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidArticle {
    pub id: Option<String>,
    pub title: String,
    pub lead: Option<String>,
    pub body: String,
}

pub fn validate_comment(input: NewComment) -> Result<ValidComment> {
    let article_id = input.article_id.trim().to_string();
    if article_id.is_empty() {
        return Err(Error::NotFound("article id is empty".to_string()));
    }

    if input.text.trim().is_empty() {
        return Err(Error::InvalidArgument("field \"text\" is required".to_string()));
    }

    let username = match input.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_USERNAME.to_string(),
    };

    let parent_id = match input.parent_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(parent) if is_valid_id(parent) => Some(parent.to_string()),
        Some(parent) => {
            return Err(Error::InvalidArgument(format!(
                "malformed parent comment id: {:?}",
                parent
            )))
        }
    };

    Ok(ValidComment {
        article_id,
        text: input.text,
        username,
        parent_id,
    })
}

pub fn validate_article(input: NewArticle) -> Result<ValidArticle> {
    if input.title.trim().is_empty() {
        return Err(Error::InvalidArgument("field \"title\" is required".to_string()));
    }
    if input.body.trim().is_empty() {
        return Err(Error::InvalidArgument("field \"body\" is required".to_string()));
    }
    if let Some(ref id) = input.id {
        if !is_valid_id(id) {
            return Err(Error::InvalidArgument(format!(
                "article id must be a URL-safe token: {:?}",
                id
            )));
        }
    }

    Ok(ValidArticle {
        id: input.id,
        title: input.title,
        lead: input.lead,
        body: input.body,
    })
}
