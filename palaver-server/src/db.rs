use std::collections::{HashMap, HashSet};

use anyhow::Context;
use futures::TryStreamExt;
use palaver_api::{
    AuthToken, Comment, CommentId, CommentSort, CommentStore, Error as ApiError, NewSession,
    NewUser, Post, PostId, Time, User, UserId,
};
use sqlx::Row;
use uuid::Uuid;

pub async fn create_user(
    conn: &mut sqlx::PgConnection,
    data: NewUser,
) -> anyhow::Result<Result<User, ApiError>> {
    let existing = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&data.email)
        .fetch_optional(&mut *conn)
        .await
        .context("checking for an existing email")?;
    if existing.is_some() {
        return Ok(Err(ApiError::EmailAlreadyUsed(data.email)));
    }
    let user = User {
        id: UserId(Uuid::new_v4()),
        name: data.name,
        email: data.email,
    };
    let hash = bcrypt::hash(&data.password, bcrypt::DEFAULT_COST).context("hashing password")?;
    let res = sqlx::query("INSERT INTO users VALUES ($1, $2, $3, $4)")
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(hash)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("inserting user {:?}", user.id))?;
    anyhow::ensure!(
        res.rows_affected() == 1,
        "insertion of user {:?} affected {} rows",
        user.id,
        res.rows_affected()
    );
    // TODO: also map the unique-constraint race on email to EmailAlreadyUsed
    Ok(Ok(user))
}

pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    s: &NewSession,
) -> anyhow::Result<Option<AuthToken>> {
    let row = sqlx::query("SELECT id, password FROM users WHERE email = $1")
        .bind(&s.email)
        .fetch_optional(&mut *conn)
        .await
        .context("querying users table")?;
    let row = match row {
        None => return Ok(None),
        Some(r) => r,
    };
    let hash: String = row
        .try_get("password")
        .context("retrieving the password field")?;
    if !bcrypt::verify(&s.password, &hash).context("verifying password")? {
        return Ok(None);
    }
    let user_id: Uuid = row.try_get("id").context("retrieving the id field")?;
    let token = AuthToken(Uuid::new_v4());
    sqlx::query("INSERT INTO sessions VALUES ($1, $2, $3, $4)")
        .bind(token.0)
        .bind(user_id)
        .bind(&s.device)
        .bind(chrono::Utc::now())
        .execute(&mut *conn)
        .await
        .context("inserting session")?;
    Ok(Some(token))
}

pub async fn logout_user(conn: &mut sqlx::PgConnection, token: &AuthToken) -> anyhow::Result<bool> {
    Ok(sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token.0)
        .execute(conn)
        .await
        .context("deleting session")?
        .rows_affected()
        > 0)
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> anyhow::Result<Option<UserId>> {
    Ok(sqlx::query("SELECT user_id FROM sessions WHERE token = $1")
        .bind(token.0)
        .fetch_optional(conn)
        .await
        .context("querying sessions table")?
        .map(|r| r.try_get("user_id").map(UserId))
        .transpose()
        .context("retrieving the user_id field")?)
}

/// `CommentStore` over a live postgres connection.
pub struct PostgresStore<'a> {
    pub conn: &'a mut sqlx::PgConnection,
}

#[async_trait::async_trait]
impl CommentStore for PostgresStore<'_> {
    async fn insert_post(&mut self, post: &Post) -> anyhow::Result<()> {
        let res = sqlx::query("INSERT INTO posts VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(post.id.0)
            .bind(post.author.0)
            .bind(&post.title)
            .bind(&post.description)
            .bind(post.status.as_str())
            .bind(post.created_at)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("inserting post {:?}", post.id))?;
        anyhow::ensure!(
            res.rows_affected() == 1,
            "insertion of post {:?} affected {} rows",
            post.id,
            res.rows_affected()
        );
        Ok(())
    }

    async fn fetch_post(&mut self, id: PostId) -> anyhow::Result<Option<Post>> {
        sqlx::query(
            "SELECT id, author_id, title, description, status, created_at
                FROM posts
            WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.conn)
        .await
        .context("querying posts table")?
        .map(|r| post_from_row(&r))
        .transpose()
    }

    async fn count_posts(&mut self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM posts")
            .fetch_one(&mut *self.conn)
            .await
            .context("counting posts")?
            .try_get("count")
            .context("retrieving the count field")?;
        Ok(count as u64)
    }

    async fn posts_page(&mut self, offset: u64, limit: u32) -> anyhow::Result<Vec<Post>> {
        sqlx::query(
            "SELECT id, author_id, title, description, status, created_at
                FROM posts
            ORDER BY created_at DESC, id
            OFFSET $1 LIMIT $2",
        )
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&mut *self.conn)
        .await
        .context("querying posts table")?
        .iter()
        .map(post_from_row)
        .collect()
    }

    async fn insert_comment(&mut self, comment: &Comment) -> anyhow::Result<()> {
        let res = sqlx::query("INSERT INTO comments VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(comment.id.0)
            .bind(comment.post.0)
            .bind(comment.author.0)
            .bind(comment.parent.map(|p| p.0))
            .bind(&comment.message)
            .bind(comment.created_at)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("inserting comment {:?}", comment.id))?;
        anyhow::ensure!(
            res.rows_affected() == 1,
            "insertion of comment {:?} affected {} rows",
            comment.id,
            res.rows_affected()
        );
        Ok(())
    }

    async fn fetch_comment(&mut self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, post_id, author_id, parent_id, message, created_at
                FROM comments
            WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.conn)
        .await
        .context("querying comments table")?;
        let row = match row {
            None => return Ok(None),
            Some(r) => r,
        };
        let mut comment = comment_from_row(&row)?;
        comment.favorites = fetch_reactions(&mut *self.conn, "comment_favorites", &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        comment.dislikes = fetch_reactions(&mut *self.conn, "comment_dislikes", &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(comment))
    }

    async fn update_message(&mut self, id: CommentId, message: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE comments SET message = $2 WHERE id = $1")
            .bind(id.0)
            .bind(message)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("updating message of comment {:?}", id))?;
        Ok(())
    }

    async fn update_reactions(&mut self, comment: &Comment) -> anyhow::Result<()> {
        // Overwrite both sides wholesale; delete-then-insert keeps the
        // call idempotent under retries.
        for (table, users) in [
            ("comment_favorites", &comment.favorites),
            ("comment_dislikes", &comment.dislikes),
        ] {
            let sql = format!("DELETE FROM {} WHERE comment_id = $1", table);
            sqlx::query(&sql)
                .bind(comment.id.0)
                .execute(&mut *self.conn)
                .await
                .with_context(|| format!("clearing {} of comment {:?}", table, comment.id))?;
            if users.is_empty() {
                continue;
            }
            let users: Vec<Uuid> = users.iter().map(|u| u.0).collect();
            let sql = format!(
                "INSERT INTO {} (comment_id, user_id) SELECT $1::uuid, unnest($2::uuid[])",
                table
            );
            sqlx::query(&sql)
                .bind(comment.id.0)
                .bind(&users)
                .execute(&mut *self.conn)
                .await
                .with_context(|| format!("filling {} of comment {:?}", table, comment.id))?;
        }
        Ok(())
    }

    async fn children_of(&mut self, parents: &[CommentId]) -> anyhow::Result<Vec<CommentId>> {
        let ids: Vec<Uuid> = parents.iter().map(|c| c.0).collect();
        sqlx::query("SELECT id FROM comments WHERE parent_id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.conn)
            .await
            .context("querying comments table for replies")?
            .iter()
            .map(|r| {
                r.try_get("id")
                    .map(CommentId)
                    .context("retrieving the id field")
            })
            .collect()
    }

    async fn delete_comments(&mut self, ids: &[CommentId]) -> anyhow::Result<()> {
        let ids: Vec<Uuid> = ids.iter().map(|c| c.0).collect();
        sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *self.conn)
            .await
            .context("bulk-deleting comments")?;
        Ok(())
    }

    async fn count_comments(&mut self, post: PostId) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE post_id = $1")
            .bind(post.0)
            .fetch_one(&mut *self.conn)
            .await
            .with_context(|| format!("counting comments of post {:?}", post))?
            .try_get("count")
            .context("retrieving the count field")?;
        Ok(count as u64)
    }

    async fn comments_page(
        &mut self,
        post: PostId,
        sort: CommentSort,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<Vec<Comment>> {
        let order = match sort {
            CommentSort::Newest => "c.created_at DESC",
            CommentSort::MostLiked => "favorites_count DESC, c.created_at DESC",
            CommentSort::MostDisliked => "dislikes_count DESC, c.created_at DESC",
        };
        let sql = format!(
            "SELECT c.id, c.post_id, c.author_id, c.parent_id, c.message, c.created_at,
                    (SELECT COUNT(*) FROM comment_favorites f WHERE f.comment_id = c.id) AS favorites_count,
                    (SELECT COUNT(*) FROM comment_dislikes d WHERE d.comment_id = c.id) AS dislikes_count
                FROM comments c
            WHERE c.post_id = $1
            ORDER BY {}, c.id
            OFFSET $2 LIMIT $3",
            order
        );
        let rows = sqlx::query(&sql)
            .bind(post.0)
            .bind(offset as i64)
            .bind(limit as i64)
            .fetch_all(&mut *self.conn)
            .await
            .with_context(|| format!("querying comment page of post {:?}", post))?;
        let mut comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<anyhow::Result<Vec<Comment>>>()?;

        let ids: Vec<CommentId> = comments.iter().map(|c| c.id).collect();
        let mut favorites = fetch_reactions(&mut *self.conn, "comment_favorites", &ids).await?;
        let mut dislikes = fetch_reactions(&mut *self.conn, "comment_dislikes", &ids).await?;
        for c in &mut comments {
            c.favorites = favorites.remove(&c.id).unwrap_or_default();
            c.dislikes = dislikes.remove(&c.id).unwrap_or_default();
        }
        Ok(comments)
    }
}

async fn fetch_reactions(
    conn: &mut sqlx::PgConnection,
    table: &'static str,
    comments: &[CommentId],
) -> anyhow::Result<HashMap<CommentId, HashSet<UserId>>> {
    let ids: Vec<Uuid> = comments.iter().map(|c| c.0).collect();
    let sql = format!(
        "SELECT comment_id, user_id FROM {} WHERE comment_id = ANY($1)",
        table
    );
    let mut res: HashMap<CommentId, HashSet<UserId>> = HashMap::new();
    let mut rows = sqlx::query(&sql).bind(&ids).fetch(conn);
    while let Some(r) = rows
        .try_next()
        .await
        .with_context(|| format!("querying {} table", table))?
    {
        let comment: Uuid = r
            .try_get("comment_id")
            .context("retrieving the comment_id field")?;
        let user: Uuid = r
            .try_get("user_id")
            .context("retrieving the user_id field")?;
        res.entry(CommentId(comment))
            .or_insert_with(HashSet::new)
            .insert(UserId(user));
    }
    Ok(res)
}

fn post_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Post> {
    Ok(Post {
        id: PostId(row.try_get("id").context("retrieving the id field")?),
        author: UserId(
            row.try_get("author_id")
                .context("retrieving the author_id field")?,
        ),
        title: row.try_get("title").context("retrieving the title field")?,
        description: row
            .try_get("description")
            .context("retrieving the description field")?,
        status: row
            .try_get::<String, _>("status")
            .context("retrieving the status field")?
            .parse()
            .context("parsing the status field")?,
        created_at: row
            .try_get::<Time, _>("created_at")
            .context("retrieving the created_at field")?,
    })
}

fn comment_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.try_get("id").context("retrieving the id field")?),
        post: PostId(
            row.try_get("post_id")
                .context("retrieving the post_id field")?,
        ),
        author: UserId(
            row.try_get("author_id")
                .context("retrieving the author_id field")?,
        ),
        parent: row
            .try_get::<Option<Uuid>, _>("parent_id")
            .context("retrieving the parent_id field")?
            .map(CommentId),
        message: row
            .try_get("message")
            .context("retrieving the message field")?,
        favorites: HashSet::new(),
        dislikes: HashSet::new(),
        created_at: row
            .try_get::<Time, _>("created_at")
            .context("retrieving the created_at field")?,
    })
}
