//! Thread reconstruction: flat parent-pointer comments → nested replies.
//!
//! Both views are pure functions over the comments of one article, in the
//! order the store returned them (creation order).
//!
//! # Algorithm
//!
//! 1. Index comments by id, rejecting duplicate ids.
//! 2. Group comment indices by parent id in a single pass. Comments with
//!    no parent are the roots.
//! 3. Walk each root with an explicit stack, assembling nodes in
//!    post-order so every reply list keeps input order.
//!    A node deeper than [`MAX_THREAD_DEPTH`] is an [`Error::Integrity`],
//!    since stores refuse to create one.
//! 4. Anything not reached is either under an orphan (its parent is not in
//!    the input), which is logged and dropped, or part of a parent cycle,
//!    which is an [`Error::Integrity`].
//!
//! Every step is linear in the number of comments.
//!
//! # Example
//!
//! ```rust
//! use threadline_core::models::Comment;
//! use threadline_core::thread::to_nested_view;
//!
//! let c = |id: &str, parent: Option<&str>| Comment {
//!     id: id.to_string(),
//!     article_id: "a1".to_string(),
//!     parent_id: parent.map(str::to_string),
//!     username: "u".to_string(),
//!     text: "t".to_string(),
//!     created_at: 0,
//! };
//! let tree = to_nested_view(&[c("c1", None), c("c2", Some("c1"))]).unwrap();
//! assert_eq!(tree.len(), 1);
//! assert_eq!(tree[0].replies[0].id, "c2");
//! ```

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{Comment, CommentNode, FlatComment};

/// Deepest reply nesting a thread may have. A top-level comment is at
/// depth 1.
pub const MAX_THREAD_DEPTH: usize = 256;

/// Reject a reply whose parent already sits at the maximum depth.
pub fn check_reply_depth(parent_depth: usize) -> Result<()> {
    if parent_depth >= MAX_THREAD_DEPTH {
        return Err(Error::InvalidArgument(format!(
            "replies cannot nest deeper than {} levels",
            MAX_THREAD_DEPTH
        )));
    }
    Ok(())
}

/// Strip hierarchy, keeping input order.
pub fn to_flat_view(comments: &[Comment]) -> Vec<FlatComment> {
    comments.iter().map(FlatComment::from).collect()
}

/// Build the reply forest for one article's comments.
///
/// Roots and siblings appear in input order. Orphans and their
/// descendants are excluded with a warning. Duplicate ids and parent
/// cycles fail with [`Error::Integrity`], as does nesting deeper than
/// [`MAX_THREAD_DEPTH`].
pub fn to_nested_view(comments: &[Comment]) -> Result<Vec<CommentNode>> {
    let n = comments.len();

    let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, c) in comments.iter().enumerate() {
        if by_id.insert(c.id.as_str(), i).is_some() {
            return Err(Error::Integrity(format!("duplicate comment id {}", c.id)));
        }
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, c) in comments.iter().enumerate() {
        match c.parent_id.as_deref() {
            None => roots.push(i),
            Some(parent) => children.entry(parent).or_default().push(i),
        }
    }

    let mut visited = vec![false; n];
    let mut built: Vec<Option<CommentNode>> = vec![None; n];
    let mut forest = Vec::with_capacity(roots.len());
    let mut stack: Vec<(usize, bool, usize)> = Vec::new();

    for &root in &roots {
        stack.push((root, false, 1));
        while let Some((i, expanded, depth)) = stack.pop() {
            if expanded {
                let replies = replies_of(&children, &comments[i].id)
                    .iter()
                    .filter_map(|&child| built[child].take())
                    .collect();
                built[i] = Some(to_node(&comments[i], replies));
                continue;
            }
            if depth > MAX_THREAD_DEPTH {
                return Err(Error::Integrity(format!(
                    "comment {} is nested deeper than {} levels",
                    comments[i].id, MAX_THREAD_DEPTH
                )));
            }
            visited[i] = true;
            stack.push((i, true, depth));
            for &child in replies_of(&children, &comments[i].id).iter().rev() {
                stack.push((child, false, depth + 1));
            }
        }
        if let Some(node) = built[root].take() {
            forest.push(node);
        }
    }

    if visited.iter().any(|v| !v) {
        check_unreached(comments, &by_id, &visited)?;
    }

    Ok(forest)
}

fn replies_of<'a>(children: &'a HashMap<&str, Vec<usize>>, id: &str) -> &'a [usize] {
    children.get(id).map(Vec::as_slice).unwrap_or(&[])
}

fn to_node(comment: &Comment, replies: Vec<CommentNode>) -> CommentNode {
    CommentNode {
        id: comment.id.clone(),
        username: comment.username.clone(),
        text: comment.text.clone(),
        replies,
    }
}

/// Classify comments the root walk never reached.
///
/// Each unreached comment's parent chain must end at a parent id that is
/// missing from the input (an orphan). A chain longer than the input
/// itself can only be a cycle.
fn check_unreached(
    comments: &[Comment],
    by_id: &HashMap<&str, usize>,
    visited: &[bool],
) -> Result<()> {
    let n = comments.len();
    let mut under_orphan = vec![false; n];
    let mut excluded = 0usize;

    for start in 0..n {
        if visited[start] || under_orphan[start] {
            continue;
        }

        let mut path = vec![start];
        let mut cur = start;
        loop {
            let Some(parent) = comments[cur].parent_id.as_deref() else {
                // Top-level comments are always reached.
                break;
            };
            match by_id.get(parent) {
                None => {
                    tracing::warn!(
                        comment_id = %comments[cur].id,
                        missing_parent = %parent,
                        article_id = %comments[cur].article_id,
                        "orphan comment excluded from thread"
                    );
                    break;
                }
                Some(&p) if under_orphan[p] => break,
                Some(&p) => {
                    if path.len() > n {
                        return Err(Error::Integrity(format!(
                            "comment {} has a parent chain that never reaches a top-level comment",
                            comments[start].id
                        )));
                    }
                    path.push(p);
                    cur = p;
                }
            }
        }

        for i in path {
            under_orphan[i] = true;
            excluded += 1;
        }
    }

    if excluded > 0 {
        tracing::warn!(excluded, "comments excluded from thread due to missing parents");
    }
    Ok(())
}
