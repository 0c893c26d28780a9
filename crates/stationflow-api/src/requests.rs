// Update-request endpoints (admin moderation and the caller's own history)

use crate::client::StationApiClient;
use crate::error::Error;
use crate::models::{MessageResponse, UpdateRequestRecord};

impl StationApiClient {
    /// Pending update requests, admin only.
    ///
    /// `GET /stations/requests`
    pub async fn list_update_requests(&self) -> Result<Vec<UpdateRequestRecord>, Error> {
        self.get("stations/requests").await
    }

    /// The signed-in user's requests, newest first.
    ///
    /// `GET /stations/my-requests`
    pub async fn list_my_requests(&self) -> Result<Vec<UpdateRequestRecord>, Error> {
        self.get("stations/my-requests").await
    }

    /// Approve a pending request. The backend applies the new availability
    /// and broadcasts a `station-update` push event.
    ///
    /// `POST /stations/requests/{id}/approve`
    pub async fn approve_request(&self, id: &str) -> Result<MessageResponse, Error> {
        self.post_empty(&format!("stations/requests/{id}/approve"))
            .await
    }

    /// `POST /stations/requests/{id}/reject`
    pub async fn reject_request(&self, id: &str) -> Result<MessageResponse, Error> {
        self.post_empty(&format!("stations/requests/{id}/reject"))
            .await
    }
}
