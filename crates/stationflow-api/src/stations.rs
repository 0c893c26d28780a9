// Station endpoints
//
// Reads are public; creation and deletion are open on the backend but
// the client only offers them to signed-in users.

use tracing::debug;

use crate::client::StationApiClient;
use crate::error::Error;
use crate::models::{MessageResponse, NewStationRecord, RequestUpdateBody, StationRecord};

impl StationApiClient {
    /// List every station.
    ///
    /// `GET /stations`
    pub async fn list_stations(&self) -> Result<Vec<StationRecord>, Error> {
        self.get("stations").await
    }

    /// Fetch one station by id.
    ///
    /// `GET /stations/{id}`
    pub async fn get_station(&self, id: &str) -> Result<StationRecord, Error> {
        self.get(&format!("stations/{id}")).await
    }

    /// Create a station and return the stored record (with its new id).
    ///
    /// `POST /stations`
    pub async fn create_station(&self, station: &NewStationRecord) -> Result<StationRecord, Error> {
        debug!(name = %station.name, "creating station");
        self.post("stations", station).await
    }

    /// `DELETE /stations/{id}`
    pub async fn delete_station(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("stations/{id}")).await
    }

    /// Ask an admin to set the station's availability to `available`.
    ///
    /// `POST /stations/{id}/request-update`. The backend rejects values
    /// above capacity and caps non-admin users at five requests a day.
    pub async fn request_update(&self, id: &str, available: i64) -> Result<MessageResponse, Error> {
        self.post(
            &format!("stations/{id}/request-update"),
            &RequestUpdateBody { available },
        )
        .await
    }
}
