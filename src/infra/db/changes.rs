//! Change feed over Postgres LISTEN/NOTIFY.
//!
//! Row triggers (see the migrations) publish one JSON payload per mutation
//! on channel `palaver_{collection}`. Each subscription holds its own
//! listener connection; when that connection drops the stream yields a
//! `Disconnected` error and ends, and the router resubscribes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use sqlx::postgres::{PgListener, PgPool};

use crate::application::repos::{ChangeStream, StreamError};
use crate::cache::ChangeEvent;
use crate::domain::types::Collection;

pub struct PgChangeStream {
    pool: PgPool,
}

impl PgChangeStream {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn channel(collection: Collection) -> String {
        format!("palaver_{}", collection.as_str())
    }
}

#[async_trait]
impl ChangeStream for PgChangeStream {
    async fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<BoxStream<'static, Result<ChangeEvent, StreamError>>, StreamError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|err| StreamError::Disconnected(err.to_string()))?;
        listener
            .listen(&Self::channel(collection))
            .await
            .map_err(|err| StreamError::Disconnected(err.to_string()))?;

        let stream = async_stream::stream! {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        match ChangeEvent::from_payload(collection, notification.payload()) {
                            Ok(event) => yield Ok(event),
                            Err(err) => yield Err(StreamError::Malformed(err.to_string())),
                        }
                    }
                    Err(err) => {
                        yield Err(StreamError::Disconnected(err.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
