// Feedback endpoints
//
// Anyone may submit; listing and deletion are admin only.

use crate::client::StationApiClient;
use crate::error::Error;
use crate::models::{FeedbackRecord, FeedbackSubmission, MessageResponse};

impl StationApiClient {
    /// `POST /feedback`
    pub async fn submit_feedback(&self, feedback: &FeedbackSubmission) -> Result<MessageResponse, Error> {
        self.post("feedback", feedback).await
    }

    /// All feedback entries, newest first.
    ///
    /// `GET /feedback`
    pub async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>, Error> {
        self.get("feedback").await
    }

    /// `DELETE /feedback/{id}`
    pub async fn delete_feedback(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("feedback/{id}")).await
    }
}
