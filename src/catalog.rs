// Catalog Store
// Immutable tour and destination records, supplied once at start-up and read by every view.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Duplicate tour id: {0}")]
    DuplicateTourId(String),

    #[error("Duplicate destination id: {0}")]
    DuplicateDestinationId(String),

    #[error("Tour {0} has a non-positive price")]
    NonPositivePrice(String),

    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Geographic groupings, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Khyber Pakhtunkhwa (KPK)")]
    Kpk,
    #[serde(rename = "Gilgit-Baltistan")]
    GilgitBaltistan,
    #[serde(rename = "Azad Kashmir")]
    AzadKashmir,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Kpk, Region::GilgitBaltistan, Region::AzadKashmir];

    pub fn label(&self) -> &'static str {
        match self {
            Region::Kpk => "Khyber Pakhtunkhwa (KPK)",
            Region::GilgitBaltistan => "Gilgit-Baltistan",
            Region::AzadKashmir => "Azad Kashmir",
        }
    }

    // First word of the label, used on the jump-to-region buttons
    pub fn short_label(&self) -> &'static str {
        let label = self.label();
        label.split(' ').next().unwrap_or(label)
    }

    // Section anchor: lower-cased label with whitespace runs replaced by '-'
    pub fn anchor(&self) -> String {
        self.label()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase()
    }

    pub fn from_label(label: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.label() == label)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Valley,
    Lake,
    Pass,
    Trek,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub name: String,
    pub duration: String,
    pub destinations: Vec<String>,
    pub departure_days: Vec<String>,
    // PKR, no minor units
    pub price: u32,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub region: Region,
    pub tags: Vec<String>,
    pub best_season: String,
    pub accessibility: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub title: String,
    pub region: Region,
    pub description: String,
    pub image: String,
    pub highlights: Vec<String>,
    pub meta_title: String,
    pub meta_desc: String,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    tours: Vec<Tour>,
    #[serde(default)]
    destinations: Vec<Destination>,
}

// Read-only catalog, kept in declaration order
#[derive(Debug, Clone)]
pub struct Catalog {
    tours: Vec<Tour>,
    destinations: Vec<Destination>,
}

impl Catalog {
    pub fn new(tours: Vec<Tour>, destinations: Vec<Destination>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for tour in &tours {
            if !seen.insert(tour.id.as_str()) {
                return Err(CatalogError::DuplicateTourId(tour.id.clone()));
            }
            if tour.price == 0 {
                return Err(CatalogError::NonPositivePrice(tour.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for destination in &destinations {
            if !seen.insert(destination.id.as_str()) {
                return Err(CatalogError::DuplicateDestinationId(
                    destination.id.clone(),
                ));
            }
        }

        tracing::debug!(
            tours = tours.len(),
            destinations = destinations.len(),
            "catalog loaded"
        );

        Ok(Self {
            tours,
            destinations,
        })
    }

    // Accepts `{"tours": [...], "destinations": [...]}` with camelCase record keys
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::new(document.tours, document.destinations)
    }

    // The agency's published catalog
    pub fn sandhu() -> Self {
        Self {
            tours: builtin_tours(),
            destinations: builtin_destinations(),
        }
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn tour(&self, id: &str) -> Option<&Tour> {
        self.tours.iter().find(|t| t.id == id)
    }

    pub fn destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }
}

fn image_url(id: u32, width: u32, height: u32) -> String {
    format!(
        "https://images.weserv.nl/?url=https://picsum.photos/id/{}/{}/{}&output=webp&q=80",
        id, width, height
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn tour(
    id: &str,
    name: &str,
    duration: &str,
    destinations: &[&str],
    departure_days: &[&str],
    price: u32,
    image_id: u32,
    region: Region,
    tags: &[&str],
    best_season: &str,
    accessibility: &str,
) -> Tour {
    Tour {
        id: id.to_string(),
        name: name.to_string(),
        duration: duration.to_string(),
        destinations: strings(destinations),
        departure_days: strings(departure_days),
        price,
        image: image_url(image_id, 800, 600),
        category: None,
        region,
        tags: strings(tags),
        best_season: best_season.to_string(),
        accessibility: accessibility.to_string(),
    }
}

fn builtin_tours() -> Vec<Tour> {
    vec![
        tour(
            "naran-kaghan-3d",
            "3 Days Naran Kaghan Shogran Tour",
            "3 Days",
            &["Naran", "Kaghan", "Shogran", "Siri Paye"],
            &["Every Mon, Thu & Sat"],
            18500,
            1015,
            Region::Kpk,
            &["Family", "Scenic"],
            "Summer",
            "Car/Hiace",
        ),
        tour(
            "neelum-valley-3d",
            "3 Days Neelum Valley Tour",
            "3 Days",
            &["Kutton", "Keran", "Upper Neelum"],
            &["Every Mon & Thu"],
            16000,
            1016,
            Region::AzadKashmir,
            &["Adventure", "Scenic"],
            "Spring-Fall",
            "Jeep",
        ),
        tour(
            "swat-kalam-3d",
            "3 Days Swat Kalam Malam Jabba Tour",
            "3 Days",
            &["Mingora", "Kalam", "Malam Jabba"],
            &["Every Mon & Thu"],
            17500,
            1018,
            Region::Kpk,
            &["Family", "Snow"],
            "Winter/Summer",
            "Car/Hiace",
        ),
        tour(
            "ratti-gali-3d",
            "3 Days Ratti Gali Tour",
            "3 Days",
            &["Dowarian", "Ratti Gali Lake"],
            &["Every Mon & Thu"],
            19000,
            1019,
            Region::AzadKashmir,
            &["Trek", "Scenic"],
            "Summer",
            "Jeep/Hiking",
        ),
        tour(
            "taobat-4d",
            "4 Days Taobat Tour",
            "4 Days",
            &["Kel", "Taobat", "Arang Kel"],
            &["Every Wednesday Night"],
            22000,
            1020,
            Region::AzadKashmir,
            &["Off-Grid", "Adventure"],
            "Summer",
            "Jeep",
        ),
        tour(
            "hunza-skardu-8d",
            "8 Days Hunza Skardu Tour",
            "8 Days",
            &["Chilas", "Hunza", "Skardu", "Khunjerab"],
            &["Every Friday"],
            45000,
            1021,
            Region::GilgitBaltistan,
            &["Adventure", "Premium"],
            "Summer/Autumn",
            "Coaster/Pajero",
        ),
        tour(
            "hunza-valley-5d",
            "5 Days Hunza Valley Tour",
            "5 Days",
            &["Hunza", "Attabad Lake", "Passu"],
            &["Every Tue & Fri"],
            28000,
            1022,
            Region::GilgitBaltistan,
            &["Scenic", "Family"],
            "All Year",
            "Car/Hiace",
        ),
        tour(
            "skardu-6d",
            "6 Days Skardu Tour",
            "6 Days",
            &["Skardu", "Shangrila", "Deosai"],
            &["Every Monday"],
            32000,
            1023,
            Region::GilgitBaltistan,
            &["Adventure", "Family"],
            "Summer",
            "Coaster/Jeep",
        ),
        tour(
            "kumrat-3d",
            "3 Days Kumrat Tour",
            "3 Days",
            &["Kumrat Valley", "Jahaz Banda"],
            &["Every Thursday"],
            18000,
            1024,
            Region::Kpk,
            &["Off-Grid", "Nature"],
            "Summer",
            "Jeep",
        ),
    ]
}

fn builtin_destinations() -> Vec<Destination> {
    vec![
        Destination {
            id: "gilgit-baltistan".to_string(),
            title: "Gilgit-Baltistan".to_string(),
            region: Region::GilgitBaltistan,
            description: "The land of giants and turquoise lakes. Home to K2 and breathtaking Hunza Valley.".to_string(),
            image: image_url(10, 1200, 600),
            highlights: strings(&["K2 Base Camp", "Baltit Fort", "Attabad Lake"]),
            meta_title: "Explore Gilgit-Baltistan | Sandhu Travels".to_string(),
            meta_desc: "Book your tour to Gilgit-Baltistan. Explore Hunza, Skardu, and Khunjerab Pass with Sandhu Travels.".to_string(),
        },
        Destination {
            id: "khyber-pakhtunkhwa".to_string(),
            title: "Khyber Pakhtunkhwa (KPK)".to_string(),
            region: Region::Kpk,
            description: "Lush green valleys, roaring rivers, and hospitality like no other.".to_string(),
            image: image_url(1036, 1200, 600),
            highlights: strings(&["Naran Kaghan", "Swat Valley", "Kumrat Valley"]),
            meta_title: "KPK Travel Packages | Swat & Naran Tours".to_string(),
            meta_desc: "Discover the beauty of KPK. Weekly group tours to Naran, Swat, and Kalam.".to_string(),
        },
        Destination {
            id: "azad-kashmir".to_string(),
            title: "Azad Kashmir".to_string(),
            region: Region::AzadKashmir,
            description: "The Heaven on Earth. Thick forests, waterfalls, and the stunning Neelum River.".to_string(),
            image: image_url(1039, 1200, 600),
            highlights: strings(&["Neelum Valley", "Ratti Gali", "Arang Kel"]),
            meta_title: "Neelum Valley Kashmir Tours | Sandhu Travels".to_string(),
            meta_desc: "Book your dream trip to Azad Kashmir. Explore Neelum Valley and more.".to_string(),
        },
    ]
}
