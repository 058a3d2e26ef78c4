use std::collections::{btree_map, hash_map::Entry, BTreeMap, HashMap};

use base64::{engine::general_purpose::STANDARD as b64, Engine as _};
use chrono::DateTime;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    accessory::DeviceIdentity,
    error::{AggregateError, ReportError, ReportErrorCause, TransportError},
    owner::OwnerDevice,
    protocol::LocationRecord,
};

use super::{RelayResponse, RelayResult, ReportFetcher, ReportRequest};

/// Decrypted records grouped by device identifier. Records keep the order the relay returned
/// them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportBatch(BTreeMap<String, Vec<LocationRecord>>);

impl ReportBatch {
    /// Records for one device, in relay order.
    pub fn get(&self, device_id: &str) -> Option<&[LocationRecord]> {
        self.0.get(device_id).map(Vec::as_slice)
    }

    /// The most recently seen record for a device.
    pub fn latest(&self, device_id: &str) -> Option<&LocationRecord> {
        self.0
            .get(device_id)?
            .iter()
            .max_by_key(|record| record.timestamp)
    }

    /// Devices and their records, ordered by device identifier.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<LocationRecord>> {
        self.0.iter()
    }

    /// Number of devices with at least one record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no report decrypted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of records across every device.
    pub fn total_records(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// The underlying map from device identifier to records.
    pub fn into_inner(self) -> BTreeMap<String, Vec<LocationRecord>> {
        self.0
    }

    fn push(&mut self, device_id: String, record: LocationRecord) {
        self.0.entry(device_id).or_default().push(record);
    }
}

impl<'a> IntoIterator for &'a ReportBatch {
    type Item = (&'a String, &'a Vec<LocationRecord>);
    type IntoIter = btree_map::Iter<'a, String, Vec<LocationRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The result of decrypting one relay response. A response where some reports failed still
/// carries every report that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every report decrypted.
    Complete(ReportBatch),
    /// At least one report was skipped.
    Partial {
        /// The reports that decrypted.
        reports: ReportBatch,
        /// Why the rest were skipped.
        errors: AggregateError,
    },
}

impl BatchOutcome {
    fn new(reports: ReportBatch, errors: Vec<ReportError>) -> Self {
        match AggregateError::from_errors(errors) {
            None => Self::Complete(reports),
            Some(errors) => Self::Partial { reports, errors },
        }
    }

    /// Successfully decrypted records, whatever the outcome.
    pub fn reports(&self) -> &ReportBatch {
        match self {
            Self::Complete(reports) | Self::Partial { reports, .. } => reports,
        }
    }

    /// Per-report failures, if there were any.
    pub fn errors(&self) -> Option<&AggregateError> {
        match self {
            Self::Complete(_) => None,
            Self::Partial { errors, .. } => Some(errors),
        }
    }

    /// `true` when nothing was skipped.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Split into the decrypted records and the failures, if any.
    pub fn into_parts(self) -> (ReportBatch, Option<AggregateError>) {
        match self {
            Self::Complete(reports) => (reports, None),
            Self::Partial { reports, errors } => (reports, Some(errors)),
        }
    }
}

/// Request every device's reports from `fetcher` in a single call and decrypt them.
///
/// A relay failure is fatal and returns [`TransportError`]. A report that fails to decode or
/// decrypt is recorded in [`BatchOutcome::Partial`] and the rest of the batch carries on.
#[instrument(skip(devices, fetcher))]
pub async fn fetch_and_decrypt<'a, F: ReportFetcher>(
    devices: impl IntoIterator<Item = &'a DeviceIdentity>,
    fetcher: &F,
    days: u32,
) -> Result<BatchOutcome, TransportError> {
    let devices = index_devices(devices);
    let request = ReportRequest {
        ids: devices.order.iter().map(|id| id.to_string()).collect(),
        days,
    };

    debug!(devices = request.ids.len(), "requesting reports");
    let response = fetcher.fetch(&request).await?;

    decrypt_indexed(&devices, response)
}

/// Decrypt a relay response that has already been fetched. Results filed under an identifier
/// none of `devices` carries are reported as errors.
pub fn decrypt_response<'a>(
    devices: impl IntoIterator<Item = &'a DeviceIdentity>,
    response: RelayResponse,
) -> Result<BatchOutcome, TransportError> {
    decrypt_indexed(&index_devices(devices), response)
}

struct DeviceIndex<'a> {
    by_id: HashMap<&'a str, &'a DeviceIdentity>,
    order: Vec<&'a str>,
}

fn index_devices<'a>(devices: impl IntoIterator<Item = &'a DeviceIdentity>) -> DeviceIndex<'a> {
    let mut by_id = HashMap::new();
    let mut order = Vec::new();

    for device in devices {
        if let Entry::Vacant(entry) = by_id.entry(device.id()) {
            entry.insert(device);
            order.push(device.id());
        }
    }

    DeviceIndex { by_id, order }
}

fn decrypt_indexed(
    devices: &DeviceIndex<'_>,
    response: RelayResponse,
) -> Result<BatchOutcome, TransportError> {
    if !response.is_success() {
        return Err(TransportError::Status(response.status_code));
    }

    let owner = OwnerDevice::new();
    let mut reports = ReportBatch::default();
    let mut errors = Vec::new();

    for result in response.results {
        match decrypt_result(&owner, devices, &result) {
            Ok(record) => {
                debug!(device_id = %result.id, timestamp = %record.timestamp, "decrypted report");
                reports.push(result.id, record);
            }
            Err(cause) => {
                warn!(device_id = %result.id, error = %cause, "skipping report");
                errors.push(ReportError {
                    device_id: result.id,
                    payload: result.payload,
                    cause,
                });
            }
        }
    }

    info!(
        devices = reports.len(),
        records = reports.total_records(),
        errors = errors.len(),
        "decrypted relay response"
    );

    Ok(BatchOutcome::new(reports, errors))
}

fn decrypt_result(
    owner: &OwnerDevice,
    devices: &DeviceIndex<'_>,
    result: &RelayResult,
) -> Result<LocationRecord, ReportErrorCause> {
    let device = devices
        .by_id
        .get(result.id.as_str())
        .ok_or(ReportErrorCause::UnknownDevice)?;

    let payload = b64.decode(&result.payload)?;
    let report = owner.decrypt_report(&payload, device.private_key())?;
    let date_published = DateTime::from_timestamp_millis(result.date_published)
        .ok_or(ReportErrorCause::DatePublished(result.date_published))?;

    Ok(LocationRecord::new(
        report,
        date_published,
        result.description.clone(),
        result.status_code,
    ))
}
