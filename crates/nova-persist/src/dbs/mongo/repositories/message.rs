use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::change_stream::{event::ChangeStreamEvent, ChangeStream};
use mongodb::options::{FullDocumentBeforeChangeType, FullDocumentType, ReturnDocument};
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::dbs::mongo::repositories::MESSAGES;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection(MESSAGES);
        Self { collection }
    }

    pub async fn save_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// Messages of a thread, oldest first
    pub async fn get_messages(&self, thread_id: ObjectId, user_id: &str) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "thread_id": thread_id, "user_id": user_id };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn get_message(&self, message_id: ObjectId, user_id: &str) -> Result<Option<MongoMessage>> {
        let filter = doc! { "_id": message_id, "user_id": user_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Only attaches messages that have no thread yet
    pub async fn attach(
        &self,
        message_id: ObjectId,
        user_id: &str,
        thread_id: ObjectId,
    ) -> Result<Option<MongoMessage>> {
        let filter = doc! { "_id": message_id, "user_id": user_id, "thread_id": null };
        let update = doc! { "$set": { "thread_id": thread_id } };
        let attached = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(attached)
    }

    pub async fn delete_messages(&self, thread_id: ObjectId, user_id: &str) -> Result<u64> {
        let filter = doc! { "thread_id": thread_id, "user_id": user_id };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    /// Change stream of one thread's messages; deletes are matched on their
    /// pre-image
    pub async fn watch(
        &self,
        thread_id: ObjectId,
    ) -> Result<ChangeStream<ChangeStreamEvent<MongoMessage>>> {
        let stream = self
            .collection
            .watch()
            .pipeline(vec![change_filter(thread_id)])
            .full_document(FullDocumentType::UpdateLookup)
            .full_document_before_change(FullDocumentBeforeChangeType::WhenAvailable)
            .await?;
        Ok(stream)
    }
}

fn change_filter(thread_id: ObjectId) -> Document {
    doc! {
        "$match": {
            "$or": [
                { "operationType": "insert", "fullDocument.thread_id": thread_id },
                { "operationType": "update", "fullDocument.thread_id": thread_id },
                { "operationType": "delete", "fullDocumentBeforeChange.thread_id": thread_id },
            ]
        }
    }
}
