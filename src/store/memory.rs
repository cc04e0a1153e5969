//! In-process post store.

use serde_json::Value;
use tokio::sync::RwLock;

use crate::post::{Post, PostFields, PostId};
use crate::store::{BoxFuture, Lookup, PostStore, StoreError};

/// Posts held in insertion order behind an async lock.
///
/// Ids, casting, and miss handling match [`MongoStore`](super::MongoStore),
/// so the HTTP behavior is identical apart from durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PostStore for MemoryStore {
    fn create(&self, attributes: Value) -> BoxFuture<'_, Result<Post, StoreError>> {
        Box::pin(async move {
            let post = PostFields::cast(&attributes)?.into_post(PostId::generate());
            self.posts.write().await.push(post.clone());
            Ok::<_, StoreError>(post)
        })
    }

    fn find_all(&self) -> BoxFuture<'_, Result<Vec<Post>, StoreError>> {
        Box::pin(async move { Ok::<_, StoreError>(self.posts.read().await.clone()) })
    }

    fn find_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>> {
        Box::pin(async move {
            let id = PostId::parse(id)?;
            let posts = self.posts.read().await;
            Ok::<_, StoreError>(Lookup::from(posts.iter().find(|p| p.id == id).cloned()))
        })
    }

    fn update_by_id<'a>(
        &'a self,
        id: &'a str,
        fields: Value,
    ) -> BoxFuture<'a, Result<Lookup<()>, StoreError>> {
        Box::pin(async move {
            let id = PostId::parse(id)?;
            let fields = PostFields::cast(&fields)?;
            let mut posts = self.posts.write().await;
            let target = posts.iter_mut().find(|p| p.id == id);
            Ok::<_, StoreError>(Lookup::from(target.map(|post| fields.apply_to(post))))
        })
    }

    fn delete_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Lookup<Post>, StoreError>> {
        Box::pin(async move {
            let id = PostId::parse(id)?;
            let mut posts = self.posts.write().await;
            let index = posts.iter().position(|p| p.id == id);
            Ok::<_, StoreError>(Lookup::from(index.map(|i| posts.remove(i))))
        })
    }
}
