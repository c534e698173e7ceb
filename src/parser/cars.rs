//! Car topic parser.
//!
//! Reuses the generic listing extraction, reclassifies everything under the
//! fixed "autot" category, and adds detail-page parsing for vehicle
//! attributes. Detail pages carry a label/value table (`td.topic` rows)
//! plus free-text description blocks.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{CarDetails, Item, ItemCollection, Topic};
use crate::parser::{ListingParser, PageParser, extract_number};

/// Compiled selectors for the car detail page.
struct DetailSelectors {
    topic_cell: Selector,
    image: Selector,
    sub_topic_param: Selector,
    body: Selector,
}

impl DetailSelectors {
    fn new() -> Result<Self> {
        let parse = |s: &str| {
            Selector::parse(s)
                .map_err(|e| AppError::validation(format!("selector '{}': {:?}", s, e)))
        };
        Ok(Self {
            topic_cell: parse("td.topic")?,
            image: parse("img.image_next")?,
            sub_topic_param: parse("div.sub_topic div.ad_param")?,
            body: parse("div.body")?,
        })
    }
}

/// Parser for the `/autot` topic.
pub struct CarParser {
    inner: ListingParser,
    detail: DetailSelectors,
}

impl CarParser {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            inner: ListingParser::new(base_url)?,
            detail: DetailSelectors::new()?,
        })
    }

    /// Collect the label/value attribute table from a detail page.
    fn attribute_table(&self, document: &Html) -> HashMap<String, String> {
        let mut table = HashMap::new();
        for cell in document.select(&self.detail.topic_cell) {
            let label: String = cell.text().collect();
            let label = label.trim().trim_end_matches(':').to_string();

            // Value lives in the next element sibling of the label cell.
            let value = cell
                .next_siblings()
                .find_map(ElementRef::wrap)
                .map(|el| el.text().collect::<String>().trim().to_string());

            if let Some(value) = value {
                table.insert(label, value);
            }
        }
        table
    }

    fn extract_details(&self, document: &Html) -> CarDetails {
        let table = self.attribute_table(document);
        let get = |key: &str| table.get(key).cloned();
        // The site renders unset boolean attributes as a bare dash.
        let flag = |key: &str| table.get(key).is_some_and(|v| v != "-");

        let image_url = document
            .select(&self.detail.image)
            .next()
            .and_then(|el| el.value().attr("src").map(str::to_string));

        let extra_description = document
            .select(&self.detail.sub_topic_param)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());

        let info = document.select(&self.detail.body).next().map(|el| {
            let text: String = el.text().collect();
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });

        CarDetails {
            car_type: get("Ajoneuvotyyppi"),
            year: get("Vuosimalli").as_deref().and_then(extract_number),
            tax: get("Ajoneuvovero").as_deref().and_then(extract_number),
            odometer: get("Mittarilukema").as_deref().and_then(extract_number),
            fuel_expense: get("Polttoainekulut").as_deref().and_then(extract_number),
            gearbox: get("Vaihteisto"),
            fuel: get("Polttoaine"),
            plate: get("Rekisterinumero"),
            cruise_control: flag("Vakionopeudensäädin"),
            tow_hook: flag("Vetokoukku"),
            air_conditioning: flag("Ilmastointi"),
            engine_heater: flag("Lohkolämmitin"),
            extra_description,
            info,
            image_url,
        }
    }
}

impl PageParser for CarParser {
    fn topic(&self) -> Topic {
        Topic::Cars
    }

    fn parse(&self, html: Option<&str>) -> Result<ItemCollection> {
        let mut items = self.inner.parse(html)?;
        // Category post-processing pass: everything on this index is a car.
        for item in items.iter_mut() {
            item.category = "autot".to_string();
        }
        Ok(items)
    }

    fn supports_details(&self) -> bool {
        true
    }

    fn parse_details(&self, html: &str, item: &mut Item) {
        let document = Html::parse_document(html);
        item.apply_details(self.extract_details(&document));
    }
}
