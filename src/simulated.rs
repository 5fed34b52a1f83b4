// Simulated external services
// Stand-ins for the agency backend and the payment gateway: an artificial delay
// per call, plus injectable failures for exercising the unhappy paths.

use crate::booking::PendingBooking;
use crate::contact::ContactMessage;
use crate::gateway::{
    AgencyBackend, BackendError, PaymentError, PaymentGateway, PaymentReceipt, PaymentRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

pub struct SimulatedBackend {
    latency: Duration,
    failures: Mutex<VecDeque<BackendError>>,
    bookings: Mutex<Vec<PendingBooking>>,
    enquiries: Mutex<Vec<ContactMessage>>,
    request_count: AtomicUsize,
}

impl SimulatedBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failures: Mutex::new(VecDeque::new()),
            bookings: Mutex::new(Vec::new()),
            enquiries: Mutex::new(Vec::new()),
            request_count: AtomicUsize::new(0),
        }
    }

    // Queue an error for the next call
    pub fn fail_next(&self, error: BackendError) {
        self.failures.lock().push_back(error);
    }

    pub fn received_bookings(&self) -> Vec<PendingBooking> {
        self.bookings.lock().clone()
    }

    pub fn received_enquiries(&self) -> Vec<ContactMessage> {
        self.enquiries.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<(), BackendError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AgencyBackend for SimulatedBackend {
    async fn submit_booking(&self, booking: &PendingBooking) -> Result<(), BackendError> {
        self.round_trip().await?;
        self.bookings.lock().push(booking.clone());
        tracing::debug!(tour_id = %booking.tour_id, "simulated backend recorded booking");
        Ok(())
    }

    async fn submit_enquiry(&self, enquiry: &ContactMessage) -> Result<(), BackendError> {
        self.round_trip().await?;
        self.enquiries.lock().push(enquiry.clone());
        tracing::debug!("simulated backend recorded enquiry");
        Ok(())
    }
}

pub struct SimulatedPaymentGateway {
    latency: Duration,
    failures: Mutex<VecDeque<PaymentError>>,
    requests: Mutex<Vec<PaymentRequest>>,
    charge_count: AtomicUsize,
}

impl SimulatedPaymentGateway {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            charge_count: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self, error: PaymentError) {
        self.failures.lock().push_back(error);
    }

    // Every attempt, failed ones included
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().clone()
    }

    // Successful charges only
    pub fn charges(&self) -> usize {
        self.charge_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        self.requests.lock().push(request.clone());
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        self.charge_count.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentReceipt {
            transaction_id: format!("txn_{:016x}", rand::random::<u64>()),
            amount: request.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::PaymentMethod;
    use std::time::Instant;

    fn request(amount: u64) -> PaymentRequest {
        PaymentRequest {
            order_reference: "ST-TEST00001".to_string(),
            amount,
            currency: "PKR".to_string(),
            method: PaymentMethod::CardOrWallet,
            customer_email: "guest@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_gateway_failures_are_consumed_in_order() {
        let gateway = SimulatedPaymentGateway::new(Duration::ZERO);
        gateway.fail_next(PaymentError::NetworkError("reset".into()));
        gateway.fail_next(PaymentError::Declined("stolen card".into()));

        assert_eq!(
            gateway.charge(&request(500)).await,
            Err(PaymentError::NetworkError("reset".into()))
        );
        assert_eq!(
            gateway.charge(&request(500)).await,
            Err(PaymentError::Declined("stolen card".into()))
        );

        let receipt = gateway.charge(&request(18500)).await.unwrap();
        assert_eq!(receipt.amount, 18500);
        assert!(receipt.transaction_id.starts_with("txn_"));
        assert_eq!(gateway.charges(), 1);
        assert_eq!(gateway.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_backend_waits_for_latency() {
        let backend = SimulatedBackend::new(Duration::from_millis(30));
        let enquiry = ContactMessage {
            name: "Hina".to_string(),
            email: "hina@example.com".to_string(),
            message: "Family trip to Swat?".to_string(),
        };

        let started = Instant::now();
        backend.submit_enquiry(&enquiry).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(backend.received_enquiries(), vec![enquiry]);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_records_nothing() {
        let backend = SimulatedBackend::new(Duration::ZERO);
        backend.fail_next(BackendError::Rejected("quota".into()));
        let enquiry = ContactMessage {
            name: "Hina".to_string(),
            email: "hina@example.com".to_string(),
            message: "Hello".to_string(),
        };

        assert!(backend.submit_enquiry(&enquiry).await.is_err());
        assert!(backend.received_enquiries().is_empty());
        assert_eq!(backend.request_count(), 1);
    }
}
