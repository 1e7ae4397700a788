use anyhow::Context;
use axum::{
    extract::{ws::Message, Path, Query, State, WebSocketUpgrade},
    Json,
};
use futures::{SinkExt, StreamExt};
use palaver_api::{
    mutation, query, AuthToken, Comment, CommentId, CommentStore, FeedMessage, NewComment,
    NewPost, NewSession, NewUser, PageQuery, Post, PostId, PostList, PostPage, ReactionCounts,
    UpdateComment, User, UserId, Uuid,
};

use crate::{db, extractors::*, Error, PostFeeds};

pub async fn register(mut conn: PgConn, Json(data): Json<NewUser>) -> Result<Json<User>, Error> {
    data.validate()?;
    Ok(Json(
        db::create_user(&mut *conn, data)
            .await
            .context("creating user")??,
    ))
}

pub async fn login(
    mut conn: PgConn,
    Json(data): Json<NewSession>,
) -> Result<Json<AuthToken>, Error> {
    data.validate()?;
    Ok(Json(
        db::login_user(&mut *conn, &data)
            .await
            .context("logging user in")?
            .ok_or_else(Error::unauthorized)?,
    ))
}

pub async fn logout(user: PreAuth, mut conn: PgConn) -> Result<(), Error> {
    match db::logout_user(&mut *conn, &user.0).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::unauthorized()),
        Err(e) => Err(Error::Anyhow(e)),
    }
}

pub async fn whoami(Auth(user): Auth) -> Json<UserId> {
    Json(user)
}

pub async fn create_post(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Json(data): Json<NewPost>,
) -> Result<Json<Post>, Error> {
    data.validate()?;
    let post = Post::new(user, data);
    let mut store = db::PostgresStore { conn: &mut *conn };
    store
        .insert_post(&post)
        .await
        .with_context(|| format!("inserting post for {:?}", user))?;
    feeds.publish_all(FeedMessage::NewPost(post.clone())).await;
    Ok(Json(post))
}

pub async fn list_posts(
    mut conn: PgConn,
    Query(q): Query<PageQuery>,
) -> Result<Json<PostList>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    Ok(Json(query::list_posts(&mut store, &q).await?))
}

pub async fn get_post(
    mut conn: PgConn,
    Path(post): Path<PostId>,
    Query(q): Query<PageQuery>,
) -> Result<Json<PostPage>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    Ok(Json(
        query::post_with_comments(&mut store, post, &q)
            .await
            .with_context(|| format!("assembling comment page of post {:?}", post))??,
    ))
}

pub async fn create_comment(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    let comment = mutation::create_comment(&mut store, user, data)
        .await
        .context("creating comment")??;
    feeds
        .publish(comment.post, FeedMessage::NewComment(comment.clone()))
        .await;
    Ok(Json(comment))
}

pub async fn update_comment(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Path(comment): Path<CommentId>,
    Json(data): Json<UpdateComment>,
) -> Result<Json<Comment>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    let comment = mutation::update_comment(&mut store, user, comment, data.message)
        .await
        .with_context(|| format!("updating comment {:?}", comment))??;
    feeds
        .publish(comment.post, FeedMessage::CommentUpdated(comment.clone()))
        .await;
    Ok(Json(comment))
}

pub async fn delete_comment(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Path(comment): Path<CommentId>,
) -> Result<(), Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    let deleted = mutation::delete_comment(&mut store, user, comment)
        .await
        .with_context(|| format!("deleting subtree of comment {:?}", comment))??;
    // One event for the whole subtree; clients prune descendants themselves
    feeds
        .publish(deleted.post, FeedMessage::CommentDeleted(deleted.root))
        .await;
    Ok(())
}

pub async fn toggle_like(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Path(comment): Path<CommentId>,
) -> Result<Json<ReactionCounts>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    let (comment, counts) = mutation::toggle_favorite(&mut store, user, comment)
        .await
        .with_context(|| format!("toggling like on comment {:?}", comment))??;
    feeds
        .publish(
            comment.post,
            FeedMessage::CommentReaction {
                comment_id: comment.id,
                likes: counts.likes,
                dislikes: counts.dislikes,
            },
        )
        .await;
    Ok(Json(counts))
}

pub async fn toggle_dislike(
    Auth(user): Auth,
    State(feeds): State<PostFeeds>,
    mut conn: PgConn,
    Path(comment): Path<CommentId>,
) -> Result<Json<ReactionCounts>, Error> {
    let mut store = db::PostgresStore { conn: &mut *conn };
    let (comment, counts) = mutation::toggle_dislike(&mut store, user, comment)
        .await
        .with_context(|| format!("toggling dislike on comment {:?}", comment))??;
    feeds
        .publish(
            comment.post,
            FeedMessage::CommentReaction {
                comment_id: comment.id,
                likes: counts.likes,
                dislikes: counts.dislikes,
            },
        )
        .await;
    Ok(Json(counts))
}

pub async fn feed(
    ws: WebSocketUpgrade,
    State(db): State<PgPool>,
    State(feeds): State<PostFeeds>,
) -> Result<axum::response::Response, Error> {
    Ok(ws.on_upgrade(move |sock| {
        let (write, read) = sock.split();
        feed_impl(write, read, db, feeds)
    }))
}

pub async fn feed_impl<W, R>(mut write: W, mut read: R, db: PgPool, feeds: PostFeeds)
where
    W: 'static + Send + Unpin + futures::Sink<Message>,
    <W as futures::Sink<Message>>::Error: Send,
    R: 'static + Send + Unpin + futures::Stream<Item = Result<Message, axum::Error>>,
{
    // TODO: log the ip of the other websocket end
    tracing::debug!("live feed websocket connected");
    if let Some(Ok(Message::Text(token))) = read.next().await {
        if let Ok(token) = Uuid::try_from(&token as &str) {
            if let Ok(mut conn) = db.acquire().await {
                if let Ok(Some(user)) = db::recover_session(&mut *conn, AuthToken(token)).await {
                    if let Ok(_) = write.send(Message::Text(String::from("ok"))).await {
                        tracing::debug!(?user, "live feed websocket auth success");
                        feeds.add_socket(write, read).await;
                        return;
                    }
                }
            }
        }
        tracing::debug!(?token, "live feed websocket auth failure");
        let _ = write
            .send(Message::Text(String::from("permission denied")))
            .await;
    }
}
