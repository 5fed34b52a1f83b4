// External call boundaries
// Booking submission and payment both cross the network in a real deployment;
// the core only sees these traits.

use crate::booking::PendingBooking;
use crate::contact::ContactMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment gateway timed out")]
    GatewayTimeout,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl PaymentError {
    // A declined card will be declined again; transport failures may not repeat
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Declined(_) => false,
            PaymentError::GatewayTimeout | PaymentError::NetworkError(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    // Card, JazzCash or EasyPaisa
    #[default]
    CardOrWallet,
    // Direct deposit, listed but not accepted online
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 2] = [PaymentMethod::CardOrWallet, PaymentMethod::BankTransfer];

    pub fn is_available(&self) -> bool {
        match self {
            PaymentMethod::CardOrWallet => true,
            PaymentMethod::BankTransfer => false,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::CardOrWallet => f.write_str("Card Payment / Mobile Wallet"),
            PaymentMethod::BankTransfer => f.write_str("Bank Transfer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_reference: String,
    pub amount: u64,
    pub currency: String,
    pub method: PaymentMethod,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub amount: u64,
}

#[async_trait]
pub trait AgencyBackend: Send + Sync + 'static {
    // Record a booking request with the agency
    async fn submit_booking(&self, booking: &PendingBooking) -> Result<(), BackendError>;

    // Deliver a contact-form enquiry
    async fn submit_enquiry(&self, enquiry: &ContactMessage) -> Result<(), BackendError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
}
