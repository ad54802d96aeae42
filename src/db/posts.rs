//! Post storage. Each post owns an ordered list of sections.

use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

use crate::models::{NewSection, PostView, SectionView};

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Section {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub post_id: i64,
}

/// A post with its sections.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub sections: Vec<Section>,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    user_id: i64,
}

impl PostRow {
    fn with_sections(self, sections: Vec<Section>) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            user_id: self.user_id,
            sections,
        }
    }
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            sections: post
                .sections
                .into_iter()
                .map(|s| SectionView {
                    id: s.id,
                    title: s.title,
                    body: s.body,
                    post_id: s.post_id,
                })
                .collect(),
        }
    }
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a post and its sections atomically.
    pub async fn create(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        sections: &[NewSection],
    ) -> Result<Post, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let post_id = sqlx::query("INSERT INTO posts (title, content, user_id) VALUES (?, ?, ?)")
            .bind(title)
            .bind(content)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let mut created = Vec::with_capacity(sections.len());
        for section in sections {
            let id = sqlx::query("INSERT INTO sections (title, body, post_id) VALUES (?, ?, ?)")
                .bind(&section.title)
                .bind(&section.body)
                .bind(post_id)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
            created.push(Section {
                id,
                title: section.title.clone(),
                body: section.body.clone(),
                post_id,
            });
        }

        tx.commit().await?;

        Ok(Post {
            id: post_id,
            title: title.to_string(),
            content: content.to_string(),
            user_id,
            sections: created,
        })
    }

    /// Get a post with its sections.
    pub async fn get(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> =
            sqlx::query_as("SELECT id, title, content, user_id FROM posts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sections: Vec<Section> = sqlx::query_as(
            "SELECT id, title, body, post_id FROM sections WHERE post_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.with_sections(sections)))
    }

    /// List all posts (newest first) with their sections.
    pub async fn list(&self) -> Result<Vec<Post>, sqlx::Error> {
        let rows: Vec<PostRow> =
            sqlx::query_as("SELECT id, title, content, user_id FROM posts ORDER BY id DESC")
                .fetch_all(&self.pool)
                .await?;

        let sections: Vec<Section> =
            sqlx::query_as("SELECT id, title, body, post_id FROM sections ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut by_post: HashMap<i64, Vec<Section>> = HashMap::new();
        for section in sections {
            by_post.entry(section.post_id).or_default().push(section);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let sections = by_post.remove(&row.id).unwrap_or_default();
                row.with_sections(sections)
            })
            .collect())
    }

    /// Update title and/or content. Returns true if the post exists.
    pub async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET title = COALESCE(?, title), content = COALESCE(?, content), updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post and its sections in one transaction.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sections WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
