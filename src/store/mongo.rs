//! MongoDB-backed post store.
//!
//! One shared [`Client`] per process. The driver pools and re-establishes
//! connections on its own; this module only decides what to do when the very
//! first attempt fails, which is to log it and keep going.

use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::post::{Field, Post, PostFields, PostId};
use crate::store::{BoxFuture, ConnectionStatus, Lookup, PostStore, StoreError};

/// Collection holding the post documents.
pub const COLLECTION: &str = "posts";

const APP_NAME: &str = "posts-service";

/// Database used when the connection string names none.
const FALLBACK_DATABASE: &str = "test";

/// A post as stored in BSON, with a native `ObjectId` key.
#[derive(Debug, Deserialize, Serialize)]
struct PostRecord {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

impl From<Post> for PostRecord {
    fn from(post: Post) -> Self {
        Self { id: post.id.object_id(), title: post.title, body: post.body }
    }
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Self { id: PostId::from(record.id), title: record.title, body: record.body }
    }
}

/// Post store over the `posts` collection.
pub struct MongoStore {
    posts: Result<Collection<PostRecord>, String>,
}

impl MongoStore {
    /// Builds a client for `config.url` and pings the server once.
    ///
    /// Never fails. If the URL cannot even be turned into a client, every
    /// operation on the returned store fails with
    /// [`StoreError::Disconnected`]. If only the ping fails, operations go
    /// through the driver and start succeeding once the server is reachable.
    pub async fn connect(config: &DatabaseConfig) -> (Self, ConnectionStatus) {
        let client = match client_for(config).await {
            Ok(client) => client,
            Err(e) => {
                error!("connection error: {e}");
                let reason = e.to_string();
                return (Self { posts: Err(reason.clone()) }, ConnectionStatus::Failed(reason));
            }
        };

        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));
        let store = Self { posts: Ok(db.collection(COLLECTION)) };

        match db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = db.name(), "successfully opened connection to MongoDB");
                (store, ConnectionStatus::Connected)
            }
            Err(e) => {
                error!("connection error: {e}");
                (store, ConnectionStatus::Failed(e.to_string()))
            }
        }
    }

    fn collection(&self) -> Result<&Collection<PostRecord>, StoreError> {
        self.posts
            .as_ref()
            .map_err(|reason| StoreError::Disconnected { reason: reason.clone() })
    }
}

async fn client_for(config: &DatabaseConfig) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(config.url.as_str()).await?;
    options.server_selection_timeout = Some(config.connect_timeout);
    options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
    Client::with_options(options)
}

fn by_id(id: PostId) -> Document {
    doc! { "_id": id.object_id() }
}

/// `$set` body for the supplied paths; explicit nulls clear the path.
fn set_document(fields: &PostFields) -> Document {
    fields
        .supplied()
        .map(|(path, field)| {
            let value = match field {
                Field::Text(text) => Bson::String(text.clone()),
                Field::Null | Field::Absent => Bson::Null,
            };
            (path.to_owned(), value)
        })
        .collect()
}

impl PostStore for MongoStore {
    fn create(&self, attributes: Value) -> BoxFuture<'_, Result<Post, StoreError>> {
        Box::pin(async move {
            let posts = self.collection()?;
            let post = PostFields::cast(&attributes)?.into_post(PostId::generate());
            posts.insert_one(PostRecord::from(post.clone())).await?;
            Ok::<_, StoreError>(post)
        })
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Post>, StoreError>> {
        Box::pin(async move {
            let posts = self.collection()?;
            let records: Vec<PostRecord> = posts.find(doc! {}).await?.try_collect().await?;
            Ok::<_, StoreError>(records.into_iter().map(Post::from).collect())
        })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>> {
        Box::pin(async move {
            let posts = self.collection()?;
            let id = PostId::parse(id)?;
            let record = posts.find_one(by_id(id)).await?;
            Ok::<_, StoreError>(Lookup::from(record.map(Post::from)))
        })
    }

    fn update_by_id<'a>(
        &'a self,
        id: &'a str,
        fields: Value,
    ) -> BoxFuture<'a, Result<Lookup<()>, StoreError>> {
        Box::pin(async move {
            let posts = self.collection()?;
            let id = PostId::parse(id)?;
            let fields = PostFields::cast(&fields)?;

            // MongoDB rejects an empty `$set`; with nothing to write, only
            // existence is reported.
            let matched = if fields.is_empty() {
                posts.count_documents(by_id(id)).await? > 0
            } else {
                let update = doc! { "$set": set_document(&fields) };
                posts.update_one(by_id(id), update).await?.matched_count > 0
            };
            Ok::<_, StoreError>(Lookup::from(matched.then_some(())))
        })
    }

    fn delete_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>> {
        Box::pin(async move {
            let posts = self.collection()?;
            let id = PostId::parse(id)?;
            let record = posts.find_one_and_delete(by_id(id)).await?;
            Ok::<_, StoreError>(Lookup::from(record.map(Post::from)))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn unreachable() -> (MongoStore, ConnectionStatus) {
        let config = DatabaseConfig { url: "not a connection string".into(), ..DatabaseConfig::default() };
        MongoStore::connect(&config).await
    }

    #[tokio::test]
    async fn unusable_url_reports_failed_status() {
        let (_, status) = unreachable().await;
        assert!(matches!(status, ConnectionStatus::Failed(_)));
    }

    #[tokio::test]
    async fn every_operation_fails_without_a_client() {
        let (store, _) = unreachable().await;
        let id = "65f1c2a4e13b7d0012ab34cd";

        assert!(matches!(store.create(json!({})).await, Err(StoreError::Disconnected { .. })));
        assert!(matches!(store.find_all().await, Err(StoreError::Disconnected { .. })));
        assert!(matches!(store.find_by_id(id).await, Err(StoreError::Disconnected { .. })));
        assert!(matches!(store.update_by_id(id, json!({})).await, Err(StoreError::Disconnected { .. })));
        assert!(matches!(store.delete_by_id(id).await, Err(StoreError::Disconnected { .. })));
    }

    #[test]
    fn set_document_only_holds_supplied_paths() {
        let fields = PostFields::cast(&json!({"title": "C", "extra": 1})).unwrap();
        assert_eq!(set_document(&fields), doc! { "title": "C" });

        let fields = PostFields::cast(&json!({"title": null, "body": "B"})).unwrap();
        assert_eq!(set_document(&fields), doc! { "title": Bson::Null, "body": "B" });
    }

    #[test]
    fn record_conversion_keeps_object_id() {
        let post = Post { id: PostId::generate(), title: Some("A".into()), body: None };
        let record = PostRecord::from(post.clone());
        assert_eq!(record.id, post.id.object_id());
        assert_eq!(Post::from(record), post);
    }
}
