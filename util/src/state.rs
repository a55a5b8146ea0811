//! Shared state handed to every service: the database connection and the
//! live change feed. Cheap to clone.

use crate::feed::FeedManager;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    feed: FeedManager,
}

impl AppState {
    /// Bundles the connection and feed handed to every service.
    ///
    /// # Arguments
    ///
    /// * `db` - An open connection with migrations applied.
    /// * `feed` - The change feed services publish to.
    pub fn new(db: DatabaseConnection, feed: FeedManager) -> Self {
        Self { db, feed }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Returns a shared reference to the change feed.
    pub fn feed(&self) -> &FeedManager {
        &self.feed
    }
}
