//! Article and comment views shared by the CLI and the HTTP server.
//!
//! [`nested_comments`] and [`flat_comments`] read one article's comments
//! from any [`Store`] and shape them with the thread builder. The `run_*`
//! functions are the CLI entry points: they open the SQLite store, print
//! to stdout, and exit with status 1 on caller errors.

use anyhow::Result;

use threadline_core::models::{CommentNode, FlatComment, NewComment};
use threadline_core::store::Store;
use threadline_core::thread::{to_flat_view, to_nested_view};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// The reply tree of an article. `NotFound` if the article is missing.
pub async fn nested_comments(
    store: &dyn Store,
    article_id: &str,
) -> threadline_core::Result<Vec<CommentNode>> {
    let comments = store.comments_for_article(article_id).await?;
    to_nested_view(&comments)
}

/// All comments of an article in creation order, without parent links.
pub async fn flat_comments(
    store: &dyn Store,
    article_id: &str,
) -> threadline_core::Result<Vec<FlatComment>> {
    let comments = store.comments_for_article(article_id).await?;
    Ok(to_flat_view(&comments))
}

/// Unwrap a core result, exiting with status 1 on caller errors.
fn or_exit<T>(result: threadline_core::Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_caller_error() => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// `threadline articles`
pub async fn run_articles(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let articles = store.list_articles().await?;
    store.close().await;

    if articles.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    println!("{:<14} {}", "ID", "TITLE");
    for article in &articles {
        println!("{:<14} {}", article.id, article.title);
        if let Some(ref lead) = article.lead {
            println!("{:<14} {}", "", lead);
        }
    }
    Ok(())
}

/// `threadline get <id>`
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let article = or_exit(store.get_article(id).await)?;
    let comment_count = or_exit(store.comments_for_article(id).await)?.len();
    store.close().await;

    println!("--- Article ---");
    println!("id:       {}", article.id);
    println!("title:    {}", article.title);
    if let Some(ref lead) = article.lead {
        println!("lead:     {}", lead);
    }
    println!("comments: {}", comment_count);
    println!();
    println!("--- Body ---");
    println!("{}", article.body);

    Ok(())
}

/// `threadline comments <article_id> [--flat]`
pub async fn run_comments(config: &Config, article_id: &str, flat: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    if flat {
        let comments = or_exit(flat_comments(&store, article_id).await)?;
        store.close().await;
        for c in &comments {
            println!("[{}] {}: {}", c.id, c.username, c.text);
        }
        return Ok(());
    }

    let tree = or_exit(nested_comments(&store, article_id).await)?;
    store.close().await;
    print!("{}", render_tree(&tree));
    Ok(())
}

/// `threadline comment <article_id> --text T [--username U] [--reply-to C]`
pub async fn run_comment(
    config: &Config,
    article_id: &str,
    text: &str,
    username: Option<String>,
    reply_to: Option<String>,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let comment = or_exit(
        store
            .create_comment(NewComment {
                article_id: article_id.to_string(),
                text: text.to_string(),
                username,
                parent_id: reply_to,
            })
            .await,
    )?;
    store.close().await;

    println!("{}", comment.id);
    Ok(())
}

/// Render a reply tree, two spaces of indent per level.
pub fn render_tree(roots: &[CommentNode]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&CommentNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("[{}] {}: {}\n", node.id, node.username, node.text));
        stack.extend(node.replies.iter().rev().map(|r| (r, depth + 1)));
    }
    out
}
