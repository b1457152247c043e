//! Device position through GeoClue2 on the D-Bus system bus.

use async_trait::async_trait;
use futures_util::StreamExt;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Proxy};

use crate::location::{DeviceLocator, PositionRequest};
use crate::types::{Coordinates, LocationError};

const GEOCLUE_SERVICE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";

/// GClueAccuracyLevel values
const ACCURACY_CITY: u32 = 4;
const ACCURACY_EXACT: u32 = 8;

fn dbus_error(err: impl std::fmt::Display) -> LocationError {
    let msg = err.to_string();
    if msg.contains("AccessDenied") || msg.contains("not allowed") {
        LocationError::PermissionDenied
    } else {
        LocationError::Other(format!("GeoClue: {}", msg))
    }
}

#[derive(Debug, Clone)]
pub struct GeoClueLocator {
    desktop_id: String,
}

impl GeoClueLocator {
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
        }
    }
}

#[async_trait]
impl DeviceLocator for GeoClueLocator {
    async fn current_position(
        &self,
        request: &PositionRequest,
    ) -> Result<Coordinates, LocationError> {
        let conn = Connection::system().await.map_err(|e| {
            tracing::debug!("System bus unavailable: {}", e);
            LocationError::ServiceUnavailable
        })?;

        let manager = Proxy::new(&conn, GEOCLUE_SERVICE, MANAGER_PATH, MANAGER_IFACE)
            .await
            .map_err(dbus_error)?;
        let client_path: OwnedObjectPath = manager
            .call("GetClient", &())
            .await
            .map_err(|e| {
                tracing::debug!("GeoClue GetClient failed: {}", e);
                LocationError::ServiceUnavailable
            })?;

        let client = Proxy::new(&conn, GEOCLUE_SERVICE, client_path.as_str(), CLIENT_IFACE)
            .await
            .map_err(dbus_error)?;

        let accuracy = if request.high_accuracy {
            ACCURACY_EXACT
        } else {
            ACCURACY_CITY
        };
        client
            .set_property("DesktopId", self.desktop_id.as_str())
            .await
            .map_err(dbus_error)?;
        client
            .set_property("RequestedAccuracyLevel", accuracy)
            .await
            .map_err(dbus_error)?;

        // Subscribe before Start so the first fix is not missed
        let mut updates = client
            .receive_signal("LocationUpdated")
            .await
            .map_err(dbus_error)?;
        client.call_method("Start", &()).await.map_err(dbus_error)?;

        let message = updates.next().await.ok_or(LocationError::ServiceUnavailable)?;
        let (_old, new): (OwnedObjectPath, OwnedObjectPath) =
            message.body().deserialize().map_err(dbus_error)?;

        let location = Proxy::new(&conn, GEOCLUE_SERVICE, new.as_str(), LOCATION_IFACE)
            .await
            .map_err(dbus_error)?;
        let lat: f64 = location
            .get_property("Latitude")
            .await
            .map_err(dbus_error)?;
        let lon: f64 = location
            .get_property("Longitude")
            .await
            .map_err(dbus_error)?;

        if let Err(e) = client.call_method("Stop", &()).await {
            tracing::debug!("GeoClue Stop failed: {}", e);
        }

        Ok(Coordinates::new(lat, lon))
    }
}
