// Booking Capture
// Collects traveller input for one tour, validates it and hands a pending booking to checkout.

use crate::catalog::Tour;
use crate::gateway::{AgencyBackend, BackendError};
use crate::inflight::RestoreOnDrop;
use crate::navigation::NavIntent;
use crate::session::{PendingBookingSlot, StorageError};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// Date format of the travel date input
pub const TRAVEL_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    FullName,
    Email,
    Phone,
    TravelDate,
    Persons,
    PackageType,
    Message,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftField::FullName => "full name",
            DraftField::Email => "email",
            DraftField::Phone => "phone",
            DraftField::TravelDate => "travel date",
            DraftField::Persons => "number of persons",
            DraftField::PackageType => "package type",
            DraftField::Message => "message",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(DraftField),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid travel date: {0}")]
    InvalidTravelDate(String),

    #[error("Draft for tour {draft} cannot be booked as {tour}")]
    TourMismatch { draft: String, tour: String },
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A submission is already in progress")]
    InFlight,

    #[error("Booking already submitted")]
    AlreadySubmitted,

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Booking backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageType {
    #[default]
    Standard,
    Premium,
    Luxury,
}

impl PackageType {
    pub const ALL: [PackageType; 3] = [PackageType::Standard, PackageType::Premium, PackageType::Luxury];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Standard => "Standard",
            PackageType::Premium => "Premium",
            PackageType::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown package type: {}", s))
    }
}

// Lenient integer parse of the persons input: optional sign, leading digits,
// trailing text ignored. Anything that is not a positive number becomes 1.
pub fn coerce_persons(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };

    if negative || digits.is_empty() {
        return 1;
    }

    match digits.parse::<u32>() {
        Ok(0) => 1,
        Ok(n) => n,
        // Only overflow remains, the input was all digits
        Err(_) => u32::MAX,
    }
}

// In-progress form state. Every update produces a new draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub tour_id: String,
    pub travel_date: String,
    pub persons: u32,
    pub package_type: PackageType,
    pub message: Option<String>,
}

impl BookingDraft {
    pub fn open(tour: &Tour) -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            tour_id: tour.id.clone(),
            travel_date: String::new(),
            persons: 1,
            package_type: PackageType::Standard,
            message: None,
        }
    }

    pub fn with_field(mut self, field: DraftField, value: &str) -> Self {
        match field {
            DraftField::FullName => self.full_name = value.to_string(),
            DraftField::Email => self.email = value.to_string(),
            DraftField::Phone => self.phone = value.to_string(),
            DraftField::TravelDate => self.travel_date = value.to_string(),
            DraftField::Persons => self.persons = coerce_persons(value),
            DraftField::PackageType => {
                if let Ok(package) = value.parse() {
                    self.package_type = package;
                }
            }
            DraftField::Message => {
                self.message = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
        }
        self
    }

    // Returns the parsed travel date
    pub fn validate(&self) -> Result<NaiveDate, ValidationError> {
        let required = [
            (DraftField::FullName, &self.full_name),
            (DraftField::Email, &self.email),
            (DraftField::Phone, &self.phone),
            (DraftField::TravelDate, &self.travel_date),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field));
        }

        if !self.email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }

        NaiveDate::parse_from_str(self.travel_date.trim(), TRAVEL_DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidTravelDate(self.travel_date.clone()))
    }
}

// Submitted booking awaiting payment. Serialized with the front-end's camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBooking {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub tour_id: String,
    pub travel_date: NaiveDate,
    pub persons: u32,
    pub package_type: PackageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub tour_name: String,
    pub total_price: u64,
    // Older records carry no timestamp; they are stamped when read
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl PendingBooking {
    pub fn from_draft(
        draft: &BookingDraft,
        tour: &Tour,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if draft.tour_id != tour.id {
            return Err(ValidationError::TourMismatch {
                draft: draft.tour_id.clone(),
                tour: tour.id.clone(),
            });
        }
        let travel_date = draft.validate()?;

        Ok(Self {
            full_name: draft.full_name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            tour_id: tour.id.clone(),
            travel_date,
            persons: draft.persons,
            package_type: draft.package_type,
            message: draft.message.clone(),
            tour_name: tour.name.clone(),
            total_price: u64::from(tour.price) * u64::from(draft.persons),
            timestamp: now,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Editing,
    Submitting,
    // Terminal, the overlay closes on the returned intent
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub booking: PendingBooking,
    pub next: NavIntent,
}

// The booking overlay for one tour
pub struct BookingCapture {
    tour: Tour,
    draft: Mutex<BookingDraft>,
    state: Mutex<CaptureState>,
    slot: Arc<dyn PendingBookingSlot>,
    backend: Arc<dyn AgencyBackend>,
}

impl BookingCapture {
    pub fn open(
        tour: &Tour,
        slot: Arc<dyn PendingBookingSlot>,
        backend: Arc<dyn AgencyBackend>,
    ) -> Self {
        tracing::debug!(tour_id = %tour.id, "booking overlay opened");
        Self {
            tour: tour.clone(),
            draft: Mutex::new(BookingDraft::open(tour)),
            state: Mutex::new(CaptureState::Editing),
            slot,
            backend,
        }
    }

    pub fn tour(&self) -> &Tour {
        &self.tour
    }

    pub fn draft(&self) -> BookingDraft {
        self.draft.lock().clone()
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    // The submit control is disabled unless the form is editable
    pub fn can_submit(&self) -> bool {
        self.state() == CaptureState::Editing
    }

    pub fn update(&self, field: DraftField, value: &str) -> Result<(), SubmitError> {
        let state = self.state.lock();
        match *state {
            CaptureState::Editing => {}
            CaptureState::Submitting => return Err(SubmitError::InFlight),
            CaptureState::Submitted => return Err(SubmitError::AlreadySubmitted),
        }

        let mut draft = self.draft.lock();
        *draft = draft.clone().with_field(field, value);
        tracing::debug!(tour_id = %self.tour.id, field = %field, "draft updated");
        Ok(())
    }

    pub async fn submit(&self, cancel: &CancellationToken) -> Result<SubmitReceipt, SubmitError> {
        let booking = {
            let mut state = self.state.lock();
            match *state {
                CaptureState::Editing => {}
                CaptureState::Submitting => {
                    tracing::warn!(tour_id = %self.tour.id, "duplicate submission rejected");
                    return Err(SubmitError::InFlight);
                }
                CaptureState::Submitted => return Err(SubmitError::AlreadySubmitted),
            }

            let draft = self.draft.lock().clone();
            let booking = PendingBooking::from_draft(&draft, &self.tour, Utc::now()).map_err(|e| {
                tracing::info!(tour_id = %self.tour.id, error = %e, "booking draft rejected");
                e
            })?;

            *state = CaptureState::Submitting;
            booking
        };
        let in_flight = RestoreOnDrop::new(&self.state, CaptureState::Editing);

        tracing::info!(
            tour_id = %booking.tour_id,
            persons = booking.persons,
            total_price = booking.total_price,
            "submitting booking"
        );

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SubmitError::Cancelled),
            result = self.backend.submit_booking(&booking) => result.map_err(SubmitError::from),
        };
        let result = sent.and_then(|()| self.slot.put(&booking).map_err(SubmitError::from));
        in_flight.disarm();

        let mut state = self.state.lock();
        match result {
            Ok(()) => {
                *state = CaptureState::Submitted;
                tracing::info!(tour_id = %booking.tour_id, "booking submitted");
                Ok(SubmitReceipt {
                    booking,
                    next: NavIntent::GoToCheckout,
                })
            }
            Err(e) => {
                *state = CaptureState::Editing;
                tracing::warn!(tour_id = %booking.tour_id, error = %e, "booking submission failed");
                Err(e)
            }
        }
    }
}
