// Browse/Filter Views
// Pure reads over the catalog. Results keep declaration order.

use crate::catalog::{Catalog, Destination, Region, Tour};

// Number of tours shown on the home page
pub const FEATURED_TOUR_COUNT: usize = 3;

// One region block of the weekly tour plan
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSection<'a> {
    pub region: Region,
    pub anchor: String,
    pub tours: Vec<&'a Tour>,
}

pub fn tours_in_region(catalog: &Catalog, region: Region) -> Vec<&Tour> {
    catalog
        .tours()
        .iter()
        .filter(|t| t.region == region)
        .collect()
}

pub fn related_tours<'a>(catalog: &'a Catalog, destination: &Destination) -> Vec<&'a Tour> {
    tours_in_region(catalog, destination.region)
}

pub fn destinations_in_region(catalog: &Catalog, region: Option<Region>) -> Vec<&Destination> {
    catalog
        .destinations()
        .iter()
        .filter(|d| region.map_or(true, |r| d.region == r))
        .collect()
}

pub fn featured_tours(catalog: &Catalog, count: usize) -> Vec<&Tour> {
    catalog.tours().iter().take(count).collect()
}

// Regions without any tour are left out
pub fn weekly_plan(catalog: &Catalog) -> Vec<RegionSection<'_>> {
    Region::ALL
        .into_iter()
        .filter_map(|region| {
            let tours = tours_in_region(catalog, region);
            if tours.is_empty() {
                return None;
            }
            Some(RegionSection {
                region,
                anchor: region.anchor(),
                tours,
            })
        })
        .collect()
}

// "PKR 18,500"
pub fn price_label(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("PKR {}", grouped)
}
