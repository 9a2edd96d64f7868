//! Database statistics.
//!
//! `threadline stats` prints article and comment counts, the database
//! size on disk, and a per-article breakdown of comment activity.

use anyhow::Result;
use sqlx::Row;

use threadline_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let total_articles = store.count_articles().await?;
    let total_comments = store.count_comments().await?;

    let rows = sqlx::query(
        r#"
        SELECT
            a.id,
            a.title,
            COUNT(c.seq) AS comment_count,
            COUNT(c.parent_id) AS reply_count,
            MAX(c.created_at) AS last_comment_at
        FROM articles a
        LEFT JOIN comments c ON c.article_id = a.id
        GROUP BY a.seq
        ORDER BY a.seq
        "#,
    )
    .fetch_all(store.pool())
    .await?;

    store.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Threadline database stats");
    println!("=========================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Articles:  {}", total_articles);
    println!("  Comments:  {}", total_comments);

    if !rows.is_empty() {
        println!();
        println!("  By article:");
        println!(
            "  {:<14} {:<32} {:>8} {:>8}   {}",
            "ID", "TITLE", "COMMENTS", "REPLIES", "LAST COMMENT"
        );
        println!("  {}", "-".repeat(84));

        for row in &rows {
            let title: String = row.get("title");
            let last: Option<i64> = row.get("last_comment_at");
            println!(
                "  {:<14} {:<32} {:>8} {:>8}   {}",
                row.get::<String, _>("id"),
                truncate(&title, 32),
                row.get::<i64, _>("comment_count"),
                row.get::<i64, _>("reply_count"),
                last.map(format_ts).unwrap_or_else(|| "never".to_string()),
            );
        }
    }

    println!();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Millisecond timestamp as `YYYY-MM-DD HH:MM` UTC.
fn format_ts(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 32), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(0), "1970-01-01 00:00");
    }
}
