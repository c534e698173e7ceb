//! Generic listing-index parser.
//!
//! Extracts items from the site's paginated listing index. Row structure:
//! each listing is a `div.item_row` whose element id carries the listing
//! id, with description/price/date children and a category/geo fragment.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Item, ItemCollection, Topic, TradeKind, parse_date};
use crate::parser::{PageParser, extract_number};
use crate::utils::resolve_url;

/// Compiled CSS selectors for the listing-row structure.
struct RowSelectors {
    row: Selector,
    desc_link: Selector,
    price: Selector,
    date: Selector,
    image: Selector,
    cat_geo: Selector,
    geo_p: Selector,
    cat_link: Selector,
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::validation(format!("selector '{}': {:?}", s, e)))
}

impl RowSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            row: parse_selector("div.item_row")?,
            desc_link: parse_selector("div.desc a")?,
            price: parse_selector("p.list_price")?,
            date: parse_selector("div.date_image")?,
            image: parse_selector("img.item_image")?,
            cat_geo: parse_selector("div.cat_geo")?,
            geo_p: parse_selector("p")?,
            cat_link: parse_selector("a")?,
        })
    }
}

/// Parser for the all-categories listing index.
pub struct ListingParser {
    selectors: RowSelectors,
    accepted: regex::Regex,
    discarded: regex::Regex,
    base_url: Url,
}

impl ListingParser {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            selectors: RowSelectors::new()?,
            accepted: regex::Regex::new(r"^item_(\d+)$")?,
            discarded: regex::Regex::new(r"^(?:prisjakt|pp_item|listing_carousel)")?,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Listing id from the row's element id, `None` for ad/carousel rows.
    fn row_id(&self, row: &ElementRef) -> Option<u64> {
        let id_attr = row.value().attr("id")?;
        if self.discarded.is_match(id_attr) {
            return None;
        }
        self.accepted
            .captures(id_attr)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn parse_row(&self, row: &ElementRef, id: u64) -> Result<Item> {
        let sel = &self.selectors;
        let context = format!("item_{}", id);
        let missing =
            |what: &str| AppError::parse_row(context.as_str(), format!("missing {}", what));

        let desc_el = row
            .select(&sel.desc_link)
            .next()
            .ok_or_else(|| missing("description link"))?;
        let description = text_of(&desc_el);

        let raw_href = desc_el.value().attr("href").ok_or_else(|| missing("href"))?;
        let url = resolve_url(&self.base_url, raw_href)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        let price = row.select(&sel.price).next().and_then(|el| {
            let text = text_of(&el);
            let price = extract_number(&text);
            if price.is_none() {
                log::debug!("unknown price format: '{}'", text.trim());
            }
            price
        });

        let raw_date = row
            .select(&sel.date)
            .next()
            .map(|el| text_of(&el))
            .ok_or_else(|| missing("date"))?;
        let raw_date = raw_date.replace(['\n', '\t'], " ");
        let date = parse_date(raw_date.trim())?;

        let has_image = !row.value().classes().any(|c| c == "item_row_no_image");
        let image_url = if has_image {
            row.select(&sel.image)
                .next()
                .and_then(|el| el.value().attr("src").map(str::to_string))
        } else {
            None
        };

        let cat_geo = row
            .select(&sel.cat_geo)
            .next()
            .ok_or_else(|| missing("cat_geo"))?;
        let mut geo_ps = cat_geo.select(&sel.geo_p);
        let location = geo_ps
            .next()
            .map(|el| text_of(&el).trim().to_string())
            .ok_or_else(|| missing("location"))?;
        let trade_label = geo_ps
            .next()
            .map(|el| text_of(&el).trim().to_string())
            .ok_or_else(|| missing("trade kind"))?;

        let category = cat_geo
            .select(&sel.cat_link)
            .next()
            .and_then(|el| el.value().attr("title"))
            .and_then(|title| title.split(':').nth(1))
            .map(|c| c.trim().to_string())
            .ok_or_else(|| missing("category"))?;

        Ok(Item {
            id,
            description,
            price,
            date,
            location,
            category,
            url,
            image_url,
            trade_kind: TradeKind::from_label(&trade_label),
            car: None,
        })
    }

    fn parse_document(&self, html: &str) -> Result<ItemCollection> {
        let document = Html::parse_document(html);
        let mut items = ItemCollection::new("fetch");
        let mut total = 0usize;

        for row in document.select(&self.selectors.row) {
            let Some(id) = self.row_id(&row) else {
                continue;
            };
            total += 1;

            match self.parse_row(&row, id) {
                Ok(item) => items.push(item),
                // A broken date format means the whole layout changed;
                // surface it instead of skipping rows forever.
                Err(e @ AppError::DateFormat { .. }) => return Err(e),
                Err(e) => {
                    log::error!("unable to parse row: {}", e);
                    log::error!("{}\n{}", "-".repeat(70), row.html());
                }
            }
        }

        log::debug!("successfully parsed {}/{}", items.len(), total);
        Ok(items)
    }
}

impl PageParser for ListingParser {
    fn topic(&self) -> Topic {
        Topic::General
    }

    fn parse(&self, html: Option<&str>) -> Result<ItemCollection> {
        match html {
            None => Ok(ItemCollection::new("fail")),
            Some(html) if html.trim().is_empty() => Ok(ItemCollection::new("fail")),
            Some(html) => self.parse_document(html),
        }
    }
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const BASE: &str = "https://www.tori.fi";

    pub(crate) fn listing_page() -> String {
        format!(
            r#"<html><body>
            <div class="item_row" id="item_100">
              <div class="desc"><a href="{BASE}/uusimaa/Sohva_100.htm?ca=18&w=3">Sohva</a></div>
              <p class="list_price">450 €</p>
              <div class="date_image">28 elo 21:36</div>
              <img class="item_image" src="https://cdn.example/100.jpg">
              <div class="cat_geo">
                <p>Uusimaa</p>
                <p>Myydään</p>
                <a title="Kategoria: Sisustus ja huonekalut">k</a>
              </div>
            </div>
            <div class="item_row item_row_no_image" id="item_101">
              <div class="desc"><a href="/pirkanmaa/Polkupyora_101.htm">Polkupyörä</a></div>
              <p class="list_price">Sovi hinnasta</p>
              <div class="date_image">27 elo 09:12</div>
              <div class="cat_geo">
                <p>Pirkanmaa</p>
                <p>Ostetaan</p>
                <a title="Kategoria: Polkupyörät">k</a>
              </div>
            </div>
            <div class="item_row" id="pp_item_5">sponsored</div>
            <div class="item_row" id="item_102">
              <p class="list_price">10 €</p>
              <div class="date_image">27 elo 10:00</div>
              <div class="cat_geo"><p>Lappi</p><p>Myydään</p><a title="Kategoria: Muu">k</a></div>
            </div>
            </body></html>"#
        )
    }

    fn parser() -> ListingParser {
        ListingParser::new(BASE).unwrap()
    }

    #[test]
    fn test_constructs_with_valid_base_url() {
        assert!(ListingParser::new(BASE).is_ok());
    }

    #[test]
    fn test_relative_base_url_is_an_error() {
        assert!(matches!(
            ListingParser::new("tori.fi/koko_suomi"),
            Err(AppError::Url(_))
        ));
    }

    #[test]
    fn test_empty_input_yields_fail_collection() {
        let parsed = parser().parse(None).unwrap();
        assert_eq!(parsed.name(), "fail");
        assert!(parsed.is_empty());

        let parsed = parser().parse(Some("  ")).unwrap();
        assert_eq!(parsed.name(), "fail");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_extracts_well_formed_rows() {
        let parsed = parser().parse(Some(&listing_page())).unwrap();
        // item_102 lacks a description link and is skipped; pp_item_5 is an ad
        assert_eq!(parsed.len(), 2);

        let sofa = parsed.find_by_id(100).unwrap();
        assert_eq!(sofa.description, "Sohva");
        assert_eq!(sofa.price, Some(450));
        assert_eq!(sofa.location, "Uusimaa");
        assert_eq!(sofa.category, "Sisustus ja huonekalut");
        assert_eq!(sofa.trade_kind, TradeKind::Sell);
        assert_eq!(sofa.url, format!("{BASE}/uusimaa/Sohva_100.htm"));
        assert_eq!(sofa.image_url.as_deref(), Some("https://cdn.example/100.jpg"));
    }

    #[test]
    fn test_unknown_price_and_missing_image() {
        let parsed = parser().parse(Some(&listing_page())).unwrap();
        let bike = parsed.find_by_id(101).unwrap();
        assert_eq!(bike.price, None);
        assert_eq!(bike.image_url, None);
        assert_eq!(bike.trade_kind, TradeKind::Buy);
        // relative href resolved against the site root
        assert_eq!(bike.url, format!("{BASE}/pirkanmaa/Polkupyora_101.htm"));
    }

    #[test]
    fn test_broken_date_escalates() {
        let html = r#"<div class="item_row" id="item_1">
            <div class="desc"><a href="/x_1.htm">X</a></div>
            <div class="date_image">joskus myöhemmin</div>
            <div class="cat_geo"><p>Lappi</p><p>Myydään</p><a title="K: Muu">k</a></div>
        </div>"#;
        assert!(matches!(
            parser().parse(Some(html)),
            Err(AppError::DateFormat { .. })
        ));
    }
}
