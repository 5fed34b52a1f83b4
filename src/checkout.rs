// Checkout / Payment Simulation
// Reads the pending booking, prices it and runs the payment round-trip to a confirmation.

use crate::booking::PendingBooking;
use crate::config::FunnelConfig;
use crate::gateway::{PaymentError, PaymentGateway, PaymentMethod, PaymentRequest};
use crate::inflight::RestoreOnDrop;
use crate::navigation::NavIntent;
use crate::session::PendingBookingSlot;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// Flat fee added to every order, PKR
pub const SERVICE_FEE: u64 = 500;
pub const CURRENCY: &str = "PKR";
pub const ORDER_REFERENCE_PREFIX: &str = "ST-";
const ORDER_REFERENCE_LEN: usize = 9;

#[derive(Error, Debug)]
pub enum PayError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("A payment is already being processed")]
    InFlight,

    #[error("Order already paid")]
    AlreadyPaid,

    #[error("Payment cancelled")]
    Cancelled,

    #[error("Payment method not available: {0}")]
    MethodUnavailable(PaymentMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub base_fare: u64,
    pub service_fee: u64,
    pub grand_total: u64,
    // Per-person fare shown next to the base fare
    pub unit_price: u64,
}

pub fn compute_summary(pending: &PendingBooking) -> OrderSummary {
    let base_fare = pending.total_price;
    OrderSummary {
        base_fare,
        service_fee: SERVICE_FEE,
        grand_total: base_fare.saturating_add(SERVICE_FEE),
        unit_price: base_fare / u64::from(pending.persons.max(1)),
    }
}

// None for records checkout cannot price: no travellers, a total that is not a
// whole per-person fare, or a grand total past the integer range
pub fn checked_summary(pending: &PendingBooking) -> Option<OrderSummary> {
    let persons = u64::from(pending.persons);
    if persons == 0 || pending.total_price == 0 || pending.total_price % persons != 0 {
        return None;
    }
    pending.total_price.checked_add(SERVICE_FEE)?;
    Some(compute_summary(pending))
}

// "ST-" followed by upper-case alphanumerics
pub fn generate_order_reference() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ORDER_REFERENCE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}{}", ORDER_REFERENCE_PREFIX, token)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub order_reference: String,
    pub tour_name: String,
    pub amount_charged: u64,
    pub transaction_id: String,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Summary,
    Processing,
    // Terminal
    Success(Confirmation),
    // Retryable from here, the pending booking is kept
    Failed(PaymentError),
}

pub enum CheckoutEntry {
    Ready(Checkout),
    // Nothing pending, no summary is rendered
    Redirect(NavIntent),
}

impl CheckoutEntry {
    pub fn ready(self) -> Option<Checkout> {
        match self {
            CheckoutEntry::Ready(checkout) => Some(checkout),
            CheckoutEntry::Redirect(_) => None,
        }
    }
}

pub struct Checkout {
    booking: PendingBooking,
    summary: OrderSummary,
    // Shared by every attempt so a retried charge is recognisable
    order_reference: String,
    method: Mutex<PaymentMethod>,
    state: Mutex<CheckoutState>,
    slot: Arc<dyn PendingBookingSlot>,
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl Checkout {
    pub fn load(
        slot: Arc<dyn PendingBookingSlot>,
        gateway: Arc<dyn PaymentGateway>,
        config: &FunnelConfig,
    ) -> CheckoutEntry {
        let Some(booking) = slot.get() else {
            tracing::info!("checkout entered without a pending booking, redirecting home");
            return CheckoutEntry::Redirect(NavIntent::ReturnHome);
        };

        let Some(summary) = checked_summary(&booking) else {
            tracing::warn!(
                tour_id = %booking.tour_id,
                persons = booking.persons,
                total_price = booking.total_price,
                "pending booking cannot be priced, redirecting home"
            );
            return CheckoutEntry::Redirect(NavIntent::ReturnHome);
        };
        tracing::debug!(
            tour_id = %booking.tour_id,
            grand_total = summary.grand_total,
            "checkout loaded"
        );

        CheckoutEntry::Ready(Self {
            booking,
            summary,
            order_reference: generate_order_reference(),
            method: Mutex::new(PaymentMethod::default()),
            state: Mutex::new(CheckoutState::Summary),
            slot,
            gateway,
            timeout: config.payment_timeout(),
        })
    }

    pub fn booking(&self) -> &PendingBooking {
        &self.booking
    }

    pub fn summary(&self) -> OrderSummary {
        self.summary
    }

    pub fn order_reference(&self) -> &str {
        &self.order_reference
    }

    pub fn state(&self) -> CheckoutState {
        self.state.lock().clone()
    }

    pub fn method(&self) -> PaymentMethod {
        *self.method.lock()
    }

    // The pay control is hidden while processing and after success
    pub fn can_pay(&self) -> bool {
        matches!(
            *self.state.lock(),
            CheckoutState::Summary | CheckoutState::Failed(_)
        )
    }

    pub fn select_method(&self, method: PaymentMethod) -> Result<(), PayError> {
        if !method.is_available() {
            return Err(PayError::MethodUnavailable(method));
        }
        *self.method.lock() = method;
        Ok(())
    }

    pub async fn pay(&self, cancel: &CancellationToken) -> Result<Confirmation, PayError> {
        let request = {
            let mut state = self.state.lock();
            match *state {
                CheckoutState::Summary | CheckoutState::Failed(_) => {}
                CheckoutState::Processing => {
                    tracing::warn!(tour_id = %self.booking.tour_id, "duplicate payment rejected");
                    return Err(PayError::InFlight);
                }
                CheckoutState::Success(_) => return Err(PayError::AlreadyPaid),
            }
            *state = CheckoutState::Processing;

            PaymentRequest {
                order_reference: self.order_reference.clone(),
                amount: self.summary.grand_total,
                currency: CURRENCY.to_string(),
                method: self.method(),
                customer_email: self.booking.email.clone(),
            }
        };
        let in_flight = RestoreOnDrop::new(&self.state, CheckoutState::Summary);

        tracing::info!(
            order_reference = %request.order_reference,
            amount = request.amount,
            method = %request.method,
            "processing payment"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(self.timeout, self.gateway.charge(&request)) => {
                Some(result.unwrap_or(Err(PaymentError::GatewayTimeout)))
            }
        };
        in_flight.disarm();

        let mut state = self.state.lock();
        match outcome {
            None => {
                *state = CheckoutState::Summary;
                tracing::info!(order_reference = %request.order_reference, "payment cancelled");
                Err(PayError::Cancelled)
            }
            Some(Err(e)) => {
                *state = CheckoutState::Failed(e.clone());
                tracing::warn!(
                    order_reference = %request.order_reference,
                    error = %e,
                    retryable = e.is_retryable(),
                    "payment failed"
                );
                Err(e.into())
            }
            Some(Ok(receipt)) => {
                if let Err(e) = self.slot.clear() {
                    tracing::warn!(error = %e, "paid booking could not be cleared from the slot");
                }

                let confirmation = Confirmation {
                    order_reference: request.order_reference,
                    tour_name: self.booking.tour_name.clone(),
                    amount_charged: receipt.amount,
                    transaction_id: receipt.transaction_id,
                    confirmed_at: Utc::now(),
                };
                *state = CheckoutState::Success(confirmation.clone());
                tracing::info!(
                    order_reference = %confirmation.order_reference,
                    transaction_id = %confirmation.transaction_id,
                    "payment succeeded"
                );
                Ok(confirmation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::PackageType;
    use crate::config::DEFAULT_STORAGE_KEY;
    use crate::session::failing::FailingStorage;
    use crate::session::{MemoryStorage, StorageSlot};
    use crate::simulated::SimulatedPaymentGateway;
    use chrono::{NaiveDate, TimeZone};
    use test_case::test_case;
    use tokio_test::{assert_err, assert_ok};

    fn ali_khan_booking() -> PendingBooking {
        PendingBooking {
            full_name: "Ali Khan".to_string(),
            email: "ali@x.com".to_string(),
            phone: "0300-1111111".to_string(),
            tour_id: "hunza-skardu-8d".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(),
            persons: 3,
            package_type: PackageType::Premium,
            message: None,
            tour_name: "8 Days Hunza Skardu Tour".to_string(),
            total_price: 135000,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap(),
        }
    }

    fn setup(
        gateway: Arc<SimulatedPaymentGateway>,
        config: &FunnelConfig,
    ) -> (Checkout, Arc<StorageSlot<MemoryStorage>>) {
        let slot = Arc::new(StorageSlot::in_memory(DEFAULT_STORAGE_KEY));
        slot.put(&ali_khan_booking()).unwrap();
        let checkout = Checkout::load(slot.clone(), gateway, config)
            .ready()
            .expect("pending booking present");
        (checkout, slot)
    }

    #[test]
    fn test_ali_khan_summary() {
        let summary = compute_summary(&ali_khan_booking());

        assert_eq!(
            summary,
            OrderSummary {
                base_fare: 135000,
                service_fee: 500,
                grand_total: 135500,
                unit_price: 45000,
            }
        );
    }

    #[test_case(1, 18000)]
    #[test_case(4, 72000)]
    #[test_case(12, 540000)]
    fn test_grand_total_adds_service_fee(persons: u32, total_price: u64) {
        let mut booking = ali_khan_booking();
        booking.persons = persons;
        booking.total_price = total_price;

        let summary = compute_summary(&booking);

        assert_eq!(summary.grand_total, total_price + SERVICE_FEE);
        assert_eq!(summary.unit_price * u64::from(persons), total_price);
        assert_eq!(compute_summary(&booking), summary);
    }

    #[test]
    fn test_order_reference_format() {
        for _ in 0..100 {
            let reference = generate_order_reference();
            let token = reference.strip_prefix("ST-").unwrap();
            assert_eq!(token.len(), 9);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_empty_slot_redirects_home() {
        let slot = Arc::new(StorageSlot::in_memory(DEFAULT_STORAGE_KEY));
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));

        let entry = Checkout::load(slot, gateway, &FunnelConfig::instant());

        assert!(matches!(entry, CheckoutEntry::Redirect(NavIntent::ReturnHome)));
    }

    #[tokio::test]
    async fn test_successful_payment_clears_slot() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::from_millis(5)));
        let (checkout, slot) = setup(gateway.clone(), &FunnelConfig::instant());

        let confirmation = assert_ok!(checkout.pay(&CancellationToken::new()).await);

        assert!(confirmation.order_reference.starts_with("ST-"));
        assert_eq!(confirmation.amount_charged, 135500);
        assert_eq!(confirmation.tour_name, "8 Days Hunza Skardu Tour");
        assert!(slot.get().is_none());
        assert_eq!(checkout.state(), CheckoutState::Success(confirmation));
        assert_eq!(gateway.charges(), 1);
        assert!(!checkout.can_pay());
        assert!(matches!(
            checkout.pay(&CancellationToken::new()).await,
            Err(PayError::AlreadyPaid)
        ));
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_booking_and_allows_retry() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));
        gateway.fail_next(PaymentError::Declined("insufficient funds".into()));
        let (checkout, slot) = setup(gateway, &FunnelConfig::instant());

        let result = checkout.pay(&CancellationToken::new()).await;

        assert!(matches!(result, Err(PayError::Payment(PaymentError::Declined(_)))));
        assert!(matches!(checkout.state(), CheckoutState::Failed(PaymentError::Declined(_))));
        assert_eq!(slot.get(), Some(ali_khan_booking()));
        assert!(checkout.can_pay());

        assert_ok!(checkout.pay(&CancellationToken::new()).await);
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn test_slow_gateway_times_out() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(30)));
        let config = FunnelConfig {
            payment_timeout_ms: 20,
            ..FunnelConfig::instant()
        };
        let (checkout, slot) = setup(gateway, &config);

        let result = checkout.pay(&CancellationToken::new()).await;

        assert!(matches!(result, Err(PayError::Payment(PaymentError::GatewayTimeout))));
        assert!(slot.get().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_payment_returns_to_summary() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(30)));
        let (checkout, slot) = setup(gateway.clone(), &FunnelConfig::instant());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = checkout.pay(&cancel).await;

        assert!(matches!(result, Err(PayError::Cancelled)));
        assert_eq!(checkout.state(), CheckoutState::Summary);
        assert!(slot.get().is_some());
        assert_eq!(gateway.charges(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_pay_is_rejected_while_processing() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::from_millis(50)));
        let (checkout, _slot) = setup(gateway.clone(), &FunnelConfig::instant());
        let cancel = CancellationToken::new();

        let (first, second) = futures::join!(checkout.pay(&cancel), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(checkout.state(), CheckoutState::Processing);
            checkout.pay(&cancel).await
        });

        assert_ok!(first);
        assert!(matches!(second, Err(PayError::InFlight)));
        assert_eq!(gateway.charges(), 1);
    }

    #[tokio::test]
    async fn test_dropped_payment_unlocks_checkout() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::from_secs(30)));
        let (checkout, slot) = setup(gateway.clone(), &FunnelConfig::instant());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), checkout.pay(&CancellationToken::new()))
                .await;

        assert!(timed_out.is_err());
        assert_eq!(checkout.state(), CheckoutState::Summary);
        assert!(checkout.can_pay());
        assert!(slot.get().is_some());
        assert_eq!(gateway.charges(), 0);
    }

    #[tokio::test]
    async fn test_retry_reuses_order_reference() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));
        gateway.fail_next(PaymentError::GatewayTimeout);
        let (checkout, _slot) = setup(gateway.clone(), &FunnelConfig::instant());

        assert_err!(checkout.pay(&CancellationToken::new()).await);
        let confirmation = assert_ok!(checkout.pay(&CancellationToken::new()).await);

        let references: Vec<String> = gateway
            .requests()
            .into_iter()
            .map(|r| r.order_reference)
            .collect();
        assert_eq!(references.len(), 2);
        assert!(references.iter().all(|r| r == checkout.order_reference()));
        assert_eq!(confirmation.order_reference, checkout.order_reference());
    }

    #[test_case(u64::MAX, 3 ; "grand total overflows")]
    #[test_case(135000, 0 ; "no travellers")]
    #[test_case(135001, 3 ; "total is not a whole fare")]
    #[test_case(0, 3 ; "nothing to charge")]
    fn test_unpriceable_booking_redirects_home(total_price: u64, persons: u32) {
        let slot = Arc::new(StorageSlot::in_memory(DEFAULT_STORAGE_KEY));
        let mut booking = ali_khan_booking();
        booking.total_price = total_price;
        booking.persons = persons;
        slot.put(&booking).unwrap();
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));

        let entry = Checkout::load(slot, gateway, &FunnelConfig::instant());

        assert!(matches!(entry, CheckoutEntry::Redirect(NavIntent::ReturnHome)));
    }

    #[test]
    fn test_summary_never_overflows() {
        let mut booking = ali_khan_booking();
        booking.total_price = u64::MAX;

        assert_eq!(compute_summary(&booking).grand_total, u64::MAX);
        assert!(checked_summary(&booking).is_none());
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_payment_successful() {
        let storage = Arc::new(FailingStorage::default());
        let slot = Arc::new(StorageSlot::new(storage.clone(), DEFAULT_STORAGE_KEY));
        slot.put(&ali_khan_booking()).unwrap();
        storage.fail_removes(true);
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));
        let checkout = Checkout::load(slot.clone(), gateway.clone(), &FunnelConfig::instant())
            .ready()
            .expect("pending booking present");

        let confirmation = assert_ok!(checkout.pay(&CancellationToken::new()).await);

        assert_eq!(checkout.state(), CheckoutState::Success(confirmation));
        assert_eq!(gateway.charges(), 1);
        assert_eq!(slot.get(), Some(ali_khan_booking()));
    }

    #[test]
    fn test_bank_transfer_cannot_be_selected() {
        let gateway = Arc::new(SimulatedPaymentGateway::new(Duration::ZERO));
        let (checkout, _slot) = setup(gateway, &FunnelConfig::instant());

        assert_err!(checkout.select_method(PaymentMethod::BankTransfer));
        assert_eq!(checkout.method(), PaymentMethod::CardOrWallet);
        assert_ok!(checkout.select_method(PaymentMethod::CardOrWallet));
    }
}
