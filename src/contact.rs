// Contact channel and enquiry form

use crate::gateway::{AgencyBackend, BackendError};
use crate::inflight::RestoreOnDrop;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const AGENCY_NAME: &str = "Sandhu Travels";
pub const CHAT_PHONE_NUMBER: &str = "03228073331";
pub const CHAT_GREETING: &str = "Hello Sandhu Travels, I would like to reserve a travel package.";
pub const INFO_EMAIL: &str = "info@sandhutravels.pk";
pub const BOOKINGS_EMAIL: &str = "bookings@sandhutravels.pk";

// Chat deep link with a pre-filled message
pub fn chat_link(phone: &str, text: &str) -> String {
    format!("https://wa.me/{}?text={}", phone, urlencoding::encode(text))
}

pub fn agency_chat_link() -> String {
    chat_link(CHAT_PHONE_NUMBER, CHAT_GREETING)
}

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("An enquiry is already being sent")]
    InFlight,

    #[error("Enquiry cancelled")]
    Cancelled,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<(), ContactError> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ContactError::MissingField(field));
            }
        }
        if !self.email.contains('@') {
            return Err(ContactError::InvalidEmail);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    Idle,
    Submitting,
    Success,
}

pub struct ContactForm {
    message: Mutex<ContactMessage>,
    status: Mutex<ContactStatus>,
    backend: Arc<dyn AgencyBackend>,
}

impl ContactForm {
    pub fn new(backend: Arc<dyn AgencyBackend>) -> Self {
        Self {
            message: Mutex::new(ContactMessage::default()),
            status: Mutex::new(ContactStatus::Idle),
            backend,
        }
    }

    pub fn status(&self) -> ContactStatus {
        *self.status.lock()
    }

    pub fn message(&self) -> ContactMessage {
        self.message.lock().clone()
    }

    pub fn edit(&self, edit: impl FnOnce(&mut ContactMessage)) -> Result<(), ContactError> {
        let status = self.status.lock();
        if *status == ContactStatus::Submitting {
            return Err(ContactError::InFlight);
        }
        edit(&mut *self.message.lock());
        Ok(())
    }

    // Clears the form once the enquiry is delivered
    pub async fn submit(&self, cancel: &CancellationToken) -> Result<(), ContactError> {
        let enquiry = {
            let mut status = self.status.lock();
            if *status == ContactStatus::Submitting {
                return Err(ContactError::InFlight);
            }
            let enquiry = self.message.lock().clone();
            enquiry.validate()?;
            *status = ContactStatus::Submitting;
            enquiry
        };
        let in_flight = RestoreOnDrop::new(&self.status, ContactStatus::Idle);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ContactError::Cancelled),
            sent = self.backend.submit_enquiry(&enquiry) => sent.map_err(ContactError::from),
        };
        in_flight.disarm();

        let mut status = self.status.lock();
        match result {
            Ok(()) => {
                *self.message.lock() = ContactMessage::default();
                *status = ContactStatus::Success;
                tracing::info!("enquiry delivered");
                Ok(())
            }
            Err(e) => {
                *status = ContactStatus::Idle;
                tracing::warn!(error = %e, "enquiry not delivered");
                Err(e)
            }
        }
    }

    // Dismisses the success notice
    pub fn reset(&self) {
        let mut status = self.status.lock();
        if *status == ContactStatus::Success {
            *status = ContactStatus::Idle;
        }
    }
}
