use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::extract::ws::Message;
use futures::{channel::mpsc, select, SinkExt, StreamExt};
use palaver_api::{ClientMessage, FeedMessage, PostId};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Registry of live feed sockets and the post topics each one joined.
///
/// A socket only receives a post's events after sending a join frame for
/// it; there is no leave, a topic membership lasts until the socket goes
/// away. Delivery is fire-and-forget: a dead socket is dropped, never
/// waited on.
#[derive(Clone, Debug)]
pub struct PostFeeds(Arc<RwLock<HashMap<Uuid, Subscriber>>>);

#[derive(Debug)]
struct Subscriber {
    sender: mpsc::UnboundedSender<FeedMessage>,
    posts: HashSet<PostId>,
}

impl PostFeeds {
    pub fn new() -> PostFeeds {
        PostFeeds(Arc::new(RwLock::new(HashMap::new())))
    }

    pub async fn add_socket<W, R>(self, mut write: W, read: R)
    where
        W: 'static + Send + Unpin + futures::Sink<Message>,
        <W as futures::Sink<Message>>::Error: Send,
        R: 'static + Send + Unpin + futures::Stream<Item = Result<Message, axum::Error>>,
    {
        // Create relayer channel
        // Note: if this were bounded, there would be a deadlock between the write-lock to remove a socket and the read-lock to publish an event to all interested sockets
        let (sender, mut receiver) = mpsc::unbounded();
        let socket_id = Uuid::new_v4();

        // TODO: limit to some reasonable number of sockets, to avoid starvations
        self.0.write().await.insert(
            socket_id,
            Subscriber {
                sender,
                posts: HashSet::new(),
            },
        );

        // Start relayer queue
        let this = self.clone();
        let mut read = read.fuse();
        tokio::spawn(async move {
            macro_rules! remove_self {
                () => {{
                    this.0.write().await.remove(&socket_id);
                    return;
                }};
            }
            macro_rules! send_message {
                ( $msg:expr ) => {{
                    let msg: FeedMessage = $msg;
                    let json = match serde_json::to_vec(&msg) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::error!(?err, ?msg, "failed serializing message to json");
                            continue;
                        }
                    };
                    if let Err(_) = write.send(Message::Binary(json)).await {
                        remove_self!();
                    }
                }};
            }
            loop {
                select! {
                    msg = receiver.next() => match msg {
                        None => remove_self!(),
                        Some(msg) => send_message!(msg),
                    },
                    msg = read.next() => match msg {
                        None => remove_self!(),
                        Some(Ok(Message::Close(_))) => remove_self!(),
                        Some(Ok(Message::Text(msg))) => match serde_json::from_str(&msg) {
                            Ok(ClientMessage::Ping) => send_message!(FeedMessage::Pong),
                            Ok(ClientMessage::JoinPost(post)) => {
                                if let Some(sub) = this.0.write().await.get_mut(&socket_id) {
                                    sub.posts.insert(post);
                                }
                            }
                            Err(_) => {
                                tracing::warn!("received unexpected message from client: {msg:?}");
                                remove_self!();
                            }
                        },
                        Some(msg) => {
                            tracing::warn!("received unexpected message from client: {msg:?}");
                            remove_self!();
                        }
                    },
                }
            }
        });
    }

    /// Fan an event out to every socket that joined `post`'s topic.
    ///
    /// Handlers call this right after the store write returns, on the
    /// same control-flow path, so subscribers of one topic observe
    /// events in commit order.
    pub async fn publish(&self, post: PostId, msg: FeedMessage) {
        for sub in self.0.read().await.values() {
            if sub.posts.contains(&post) {
                let _ = sub.sender.unbounded_send(msg.clone());
            }
        }
    }

    /// Fan an event out to every connected socket, joined or not.
    pub async fn publish_all(&self, msg: FeedMessage) {
        for sub in self.0.read().await.values() {
            let _ = sub.sender.unbounded_send(msg.clone());
        }
    }
}
