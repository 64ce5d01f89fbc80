use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::change_stream::{event::ChangeStreamEvent, ChangeStream};
use mongodb::options::{FullDocumentBeforeChangeType, FullDocumentType, ReturnDocument};
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoThread;
use crate::dbs::mongo::repositories::THREADS;
use crate::error::Result;
use crate::models::{Thread, ThreadPatch};

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection(THREADS);
        Self { collection }
    }

    pub async fn create_thread(
        &self,
        user_id: String,
        title: Option<String>,
    ) -> Result<MongoThread> {
        let thread = MongoThread::new(user_id, title);
        self.collection.insert_one(&thread).await?;
        Ok(thread)
    }

    pub async fn get_thread(&self, thread_id: ObjectId, user_id: &str) -> Result<Option<MongoThread>> {
        let filter = doc! { "_id": thread_id, "user_id": user_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Threads of a user with the given archived flag, most recent first
    pub async fn list_threads(&self, user_id: &str, archived: bool) -> Result<Vec<MongoThread>> {
        let filter = doc! { "user_id": user_id, "archived": archived };
        let threads = self
            .collection
            .find(filter)
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    pub async fn update_thread(
        &self,
        thread_id: ObjectId,
        user_id: &str,
        patch: &ThreadPatch,
    ) -> Result<Option<MongoThread>> {
        let mut set = doc! { "updated_at": bson::DateTime::now() };
        if let Some(title) = &patch.title {
            set.insert("title", Thread::normalize_title(Some(title.clone())));
        }
        if let Some(archived) = patch.archived {
            set.insert("archived", archived);
        }
        if let Some(count) = patch.message_count {
            set.insert("message_count", count as i64);
        }

        self.find_and_update(thread_id, user_id, doc! { "$set": set }).await
    }

    /// Server-side `$inc`, so concurrent writers never lose a count
    pub async fn record_activity(
        &self,
        thread_id: ObjectId,
        user_id: &str,
    ) -> Result<Option<MongoThread>> {
        let now = bson::DateTime::now();
        let update = doc! {
            "$inc": { "message_count": 1_i64 },
            "$set": { "last_message_at": now, "updated_at": now },
        };
        self.find_and_update(thread_id, user_id, update).await
    }

    async fn find_and_update(
        &self,
        thread_id: ObjectId,
        user_id: &str,
        update: Document,
    ) -> Result<Option<MongoThread>> {
        let filter = doc! { "_id": thread_id, "user_id": user_id };
        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    /// Returns whether a row was removed
    pub async fn delete_thread(&self, thread_id: ObjectId, user_id: &str) -> Result<bool> {
        let filter = doc! { "_id": thread_id, "user_id": user_id };
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    /// Change stream of a user's threads.
    ///
    /// Deletes are matched on their pre-image, so a delete without one is
    /// never sent to anybody.
    pub async fn watch(&self, user_id: &str) -> Result<ChangeStream<ChangeStreamEvent<MongoThread>>> {
        let stream = self
            .collection
            .watch()
            .pipeline(vec![change_filter(user_id)])
            .full_document(FullDocumentType::UpdateLookup)
            .full_document_before_change(FullDocumentBeforeChangeType::WhenAvailable)
            .await?;
        Ok(stream)
    }
}

fn change_filter(user_id: &str) -> Document {
    doc! {
        "$match": {
            "$or": [
                { "operationType": { "$ne": "delete" }, "fullDocument.user_id": user_id },
                { "operationType": "delete", "fullDocumentBeforeChange.user_id": user_id },
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_branch_is_scoped_to_owner() {
        let filter = change_filter("alice");
        let branches = filter
            .get_document("$match")
            .and_then(|m| m.get_array("$or"))
            .unwrap();

        assert_eq!(branches.len(), 2);
        for branch in branches {
            let branch = branch.as_document().unwrap();
            let owner = branch
                .get_str("fullDocument.user_id")
                .or_else(|_| branch.get_str("fullDocumentBeforeChange.user_id"))
                .unwrap();
            assert_eq!(owner, "alice");
        }
    }
}
