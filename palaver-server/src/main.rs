use anyhow::Context;
use axum::routing::{get, patch, post};
use std::net::SocketAddr;

mod db;
mod error;
mod extractors;
mod feeds;
mod handlers;

pub use error::Error;
pub use extractors::{AppState, Auth, PgConn, PgPool, PreAuth};
pub use feeds::PostFeeds;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(short, long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&db_url)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))?;

    sqlx::migrate!()
        .run(&db)
        .await
        .context("running pending migrations")?;

    let app = axum::Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::whoami))
        .route("/api/post/create", post(handlers::create_post))
        .route("/api/post/get/all", get(handlers::list_posts))
        .route("/api/post/:post_id", get(handlers::get_post))
        .route("/api/post/comment/create", post(handlers::create_comment))
        .route(
            "/api/post/comment/:comment_id",
            patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route(
            "/api/post/comment/:comment_id/like",
            patch(handlers::toggle_like),
        )
        .route(
            "/api/post/comment/:comment_id/dislike",
            patch(handlers::toggle_dislike),
        )
        .route("/api/feed", get(handlers::feed))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(AppState {
            db: PgPool::new(db),
            feeds: PostFeeds::new(),
        });

    tracing::info!("listening on {}", opt.bind);
    axum::Server::bind(&opt.bind)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
