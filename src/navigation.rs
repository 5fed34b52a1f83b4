// Navigation Shell
// Maps routes to view models, owns the booking overlay and follows the intents the
// booking and checkout components emit.

use crate::booking::{BookingCapture, SubmitError, SubmitReceipt};
use crate::browse::{
    destinations_in_region, featured_tours, related_tours, weekly_plan, RegionSection,
    FEATURED_TOUR_COUNT,
};
use crate::catalog::{Catalog, Destination, Region, Tour};
use crate::checkout::{Checkout, CheckoutEntry, Confirmation, PayError};
use crate::config::FunnelConfig;
use crate::contact::{agency_chat_link, ContactForm};
use crate::gateway::{AgencyBackend, PaymentGateway};
use crate::session::PendingBookingSlot;
use crate::simulated::{SimulatedBackend, SimulatedPaymentGateway};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Unknown tour: {0}")]
    UnknownTour(String),

    #[error("No booking overlay is open")]
    NoOpenBooking,

    #[error("Checkout is not active")]
    NotAtCheckout,

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Pay(#[from] PayError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Destinations { region: Option<Region> },
    WeeklyTours,
    DestinationDetail { id: String },
    Contact,
    Checkout,
}

impl Route {
    // Accepts hash-router paths such as "#/destination/azad-kashmir"
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.strip_prefix('#').unwrap_or(path);
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let path = path.trim_end_matches('/');

        match path {
            "" => Some(Route::Home),
            "/destinations" => Some(Route::Destinations {
                region: query.and_then(region_from_query),
            }),
            "/weekly-tours" => Some(Route::WeeklyTours),
            "/contact" => Some(Route::Contact),
            "/checkout" => Some(Route::Checkout),
            other => other
                .strip_prefix("/destination/")
                .filter(|id| !id.is_empty() && !id.contains('/'))
                .map(|id| Route::DestinationDetail { id: id.to_string() }),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Destinations { region: None } => "/destinations".to_string(),
            Route::Destinations { region: Some(region) } => {
                format!("/destinations?region={}", urlencoding::encode(region.label()))
            }
            Route::WeeklyTours => "/weekly-tours".to_string(),
            Route::DestinationDetail { id } => format!("/destination/{}", id),
            Route::Contact => "/contact".to_string(),
            Route::Checkout => "/checkout".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn region_from_query(query: &str) -> Option<Region> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "region")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .and_then(|label| Region::from_label(&label))
}

// Header and footer links
pub const NAV_LINKS: [(&str, &str); 4] = [
    ("Home", "/"),
    ("Destinations", "/destinations"),
    ("Weekly Tours", "/weekly-tours"),
    ("Contact", "/contact"),
];

// Transitions requested by the core; the routing mechanism is the caller's
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavIntent {
    GoToCheckout,
    ReturnHome,
    Redirect(Route),
}

impl NavIntent {
    pub fn target(&self) -> Route {
        match self {
            NavIntent::GoToCheckout => Route::Checkout,
            NavIntent::ReturnHome => Route::Home,
            NavIntent::Redirect(route) => route.clone(),
        }
    }
}

pub enum View<'a> {
    Home {
        featured: Vec<&'a Tour>,
        regions: [Region; 3],
    },
    Destinations {
        region: Option<Region>,
        destinations: Vec<&'a Destination>,
    },
    WeeklyTours {
        sections: Vec<RegionSection<'a>>,
    },
    DestinationDetail {
        destination: &'a Destination,
        related: Vec<&'a Tour>,
    },
    Contact {
        chat_link: String,
    },
    Checkout(&'a Checkout),
}

pub struct Shell {
    catalog: Arc<Catalog>,
    slot: Arc<dyn PendingBookingSlot>,
    backend: Arc<dyn AgencyBackend>,
    gateway: Arc<dyn PaymentGateway>,
    config: FunnelConfig,
    current: Route,
    booking: Option<BookingCapture>,
    checkout: Option<Checkout>,
    contact: ContactForm,
}

impl Shell {
    pub fn new(
        catalog: Arc<Catalog>,
        slot: Arc<dyn PendingBookingSlot>,
        backend: Arc<dyn AgencyBackend>,
        gateway: Arc<dyn PaymentGateway>,
        config: FunnelConfig,
    ) -> Self {
        Self {
            contact: ContactForm::new(Arc::clone(&backend)),
            catalog,
            slot,
            backend,
            gateway,
            config,
            current: Route::Home,
            booking: None,
            checkout: None,
        }
    }

    // Wires the simulated backend and gateway with the configured latencies
    pub fn simulated(
        catalog: Arc<Catalog>,
        slot: Arc<dyn PendingBookingSlot>,
        config: FunnelConfig,
    ) -> Self {
        let backend = Arc::new(SimulatedBackend::new(config.submit_latency()));
        let gateway = Arc::new(SimulatedPaymentGateway::new(config.payment_latency()));
        let enquiries = Arc::new(SimulatedBackend::new(config.contact_latency()));

        let mut shell = Self::new(catalog, slot, backend, gateway, config);
        shell.contact = ContactForm::new(enquiries);
        shell
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn booking(&self) -> Option<&BookingCapture> {
        self.booking.as_ref()
    }

    pub fn checkout(&self) -> Option<&Checkout> {
        self.checkout.as_ref()
    }

    pub fn contact(&self) -> &ContactForm {
        &self.contact
    }

    // Replaces any overlay that is already open
    pub fn open_booking(&mut self, tour_id: &str) -> Result<&BookingCapture, ShellError> {
        let tour = self
            .catalog
            .tour(tour_id)
            .ok_or_else(|| ShellError::UnknownTour(tour_id.to_string()))?;

        let capture = BookingCapture::open(tour, Arc::clone(&self.slot), Arc::clone(&self.backend));
        Ok(self.booking.insert(capture))
    }

    // Discards the draft; nothing was persisted
    pub fn close_booking(&mut self) {
        if let Some(capture) = self.booking.take() {
            tracing::debug!(tour_id = %capture.tour().id, "booking overlay closed");
        }
    }

    pub async fn submit_booking(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<SubmitReceipt, ShellError> {
        let capture = self.booking.as_ref().ok_or(ShellError::NoOpenBooking)?;
        let receipt = capture.submit(cancel).await?;
        self.apply(receipt.next.clone());
        Ok(receipt)
    }

    pub async fn pay(&mut self, cancel: &CancellationToken) -> Result<Confirmation, ShellError> {
        let checkout = self.checkout.as_ref().ok_or(ShellError::NotAtCheckout)?;
        Ok(checkout.pay(cancel).await?)
    }

    pub fn apply(&mut self, intent: NavIntent) -> Route {
        if intent == NavIntent::GoToCheckout {
            self.close_booking();
        }
        self.navigate(intent.target())
    }

    // Follows redirects; returns the route that was finally entered
    pub fn navigate(&mut self, route: Route) -> Route {
        let mut route = route;
        while let Some(redirect) = self.enter(&route) {
            tracing::info!(from = %route, to = %redirect, "redirect");
            route = redirect;
        }

        if route != Route::Checkout {
            self.checkout = None;
        }
        tracing::info!(route = %route, "navigated");
        self.current = route.clone();
        route
    }

    pub fn navigate_path(&mut self, path: &str) -> Route {
        match Route::parse(path) {
            Some(route) => self.navigate(route),
            None => {
                tracing::info!(path = path, "unknown path, returning home");
                self.navigate(Route::Home)
            }
        }
    }

    fn enter(&mut self, route: &Route) -> Option<Route> {
        match route {
            Route::DestinationDetail { id } if self.catalog.destination(id).is_none() => {
                Some(Route::Destinations { region: None })
            }
            Route::Checkout => {
                // Re-entering an active checkout keeps its state
                if self.current == Route::Checkout && self.checkout.is_some() {
                    return None;
                }
                match Checkout::load(Arc::clone(&self.slot), Arc::clone(&self.gateway), &self.config) {
                    CheckoutEntry::Ready(checkout) => {
                        self.checkout = Some(checkout);
                        None
                    }
                    CheckoutEntry::Redirect(intent) => Some(intent.target()),
                }
            }
            _ => None,
        }
    }

    pub fn view(&self) -> View<'_> {
        let catalog = self.catalog.as_ref();
        match &self.current {
            Route::Destinations { region } => View::Destinations {
                region: *region,
                destinations: destinations_in_region(catalog, *region),
            },
            Route::WeeklyTours => View::WeeklyTours {
                sections: weekly_plan(catalog),
            },
            Route::DestinationDetail { id } => match catalog.destination(id) {
                Some(destination) => View::DestinationDetail {
                    destination,
                    related: related_tours(catalog, destination),
                },
                None => View::Destinations {
                    region: None,
                    destinations: destinations_in_region(catalog, None),
                },
            },
            Route::Contact => View::Contact {
                chat_link: agency_chat_link(),
            },
            Route::Checkout => match &self.checkout {
                Some(checkout) => View::Checkout(checkout),
                None => self.home_view(),
            },
            Route::Home => self.home_view(),
        }
    }

    fn home_view(&self) -> View<'_> {
        View::Home {
            featured: featured_tours(&self.catalog, FEATURED_TOUR_COUNT),
            regions: Region::ALL,
        }
    }
}
