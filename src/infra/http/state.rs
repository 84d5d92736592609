use std::sync::Arc;

use crate::application::feed::FeedService;
use crate::application::votes::VoteLedger;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<VoteLedger>,
    pub feed: Arc<FeedService>,
    pub db: Arc<PostgresRepositories>,
}
