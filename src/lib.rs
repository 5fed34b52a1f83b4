// Booking funnel for the Sandhu Travels tour agency

// Catalog data and read-only views
pub mod browse;
pub mod catalog;

// Booking capture, persistence and checkout
pub mod booking;
pub mod checkout;
pub mod session;

// External services and their simulated stand-ins
pub mod contact;
pub mod gateway;
pub mod simulated;

pub mod config;
mod inflight;
pub mod navigation;

// Re-export key types for convenience
pub use booking::{
    BookingCapture, BookingDraft, CaptureState, DraftField, PackageType, PendingBooking,
    SubmitError, SubmitReceipt, ValidationError,
};
pub use browse::{featured_tours, price_label, related_tours, weekly_plan, RegionSection};
pub use catalog::{Catalog, CatalogError, Category, Destination, Region, Tour};
pub use checkout::{
    checked_summary, compute_summary, Checkout, CheckoutEntry, CheckoutState, Confirmation,
    OrderSummary, PayError,
};
pub use config::FunnelConfig;
pub use contact::{ContactForm, ContactMessage, ContactStatus};
pub use gateway::{
    AgencyBackend, BackendError, PaymentError, PaymentGateway, PaymentMethod, PaymentReceipt,
    PaymentRequest,
};
pub use navigation::{NavIntent, Route, Shell, ShellError, View};
pub use session::{FileStorage, KeyValueStore, MemoryStorage, PendingBookingSlot, StorageSlot};
pub use simulated::{SimulatedBackend, SimulatedPaymentGateway};
