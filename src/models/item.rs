//! Listing item model.
//!
//! One `Item` is one classified listing as parsed from a listing page.
//! Identity comes from the site-assigned numeric id; the change-detection
//! key is the `(id, price)` fingerprint, so a price edit on a known
//! listing surfaces it again as new.

use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Whether a listing offers or seeks the item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeKind {
    /// "Myydään" - for sale
    Sell,
    /// "Ostetaan" - wanted to buy
    Buy,
}

impl TradeKind {
    /// Map the site's trade label to a kind. Unknown labels count as Buy
    /// so they get filtered out rather than alarmed on.
    pub fn from_label(label: &str) -> TradeKind {
        if label.trim() == "Myydään" {
            TradeKind::Sell
        } else {
            TradeKind::Buy
        }
    }
}

/// Change-detection key: listing id plus price.
///
/// Two fetches of the same unchanged listing always produce the same
/// fingerprint; a price change produces a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub id: u64,
    pub price: Option<u32>,
}

/// Vehicle attributes scraped from a car listing's detail page.
///
/// All fields optional; absence just means the seller left the field
/// blank or the detail fetch failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarDetails {
    pub car_type: Option<String>,
    pub year: Option<u32>,
    pub tax: Option<u32>,
    pub odometer: Option<u32>,
    pub fuel_expense: Option<u32>,
    pub gearbox: Option<String>,
    pub fuel: Option<String>,
    pub plate: Option<String>,
    pub cruise_control: bool,
    pub tow_hook: bool,
    pub air_conditioning: bool,
    pub engine_heater: bool,
    pub extra_description: Option<String>,
    pub info: Option<String>,
    /// Higher-resolution image than the listing-page thumbnail
    pub image_url: Option<String>,
}

/// A classified listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Site-assigned listing id, stable across fetches
    pub id: u64,

    /// Listing title text
    pub description: String,

    /// Price in euros; `None` when the listing shows no parseable price
    pub price: Option<u32>,

    /// Posting time, always resolved to a concrete calendar date
    pub date: NaiveDateTime,

    /// Region name shown on the listing row
    pub location: String,

    /// Category resolved from the row's category/geo fragment
    pub category: String,

    /// Full URL to the listing's own page
    pub url: String,

    /// Thumbnail URL, absent for image-less listings
    pub image_url: Option<String>,

    /// Sale vs. wanted
    pub trade_kind: TradeKind,

    /// Detail-page enrichment, car topic only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car: Option<CarDetails>,
}

impl Item {
    /// Dedup key for change detection.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            id: self.id,
            price: self.price,
        }
    }

    /// Merge detail-page fields into the item.
    ///
    /// Purely additive: base fields stay untouched, except that a missing
    /// thumbnail is filled from the detail page's image.
    pub fn apply_details(&mut self, mut details: CarDetails) {
        if self.image_url.is_none() && details.image_url.is_some() {
            self.image_url = details.image_url.clone();
        }
        if details.image_url.is_none() {
            details.image_url = self.image_url.clone();
        }
        self.car = Some(details);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = self
            .price
            .map_or_else(|| "n/a".to_string(), |p| p.to_string());
        write!(
            f,
            "{} - {} {: >30} {: >10} {: <45} {}",
            self.id,
            self.date.format("%Y-%m-%d %H:%M"),
            self.location,
            price,
            self.description,
            self.url
        )
    }
}

/// Finnish abbreviated month tokens in calendar order.
const MONTHS_FI: [&str; 12] = [
    "tam", "hel", "maa", "huh", "tou", "kes", "hei", "elo", "syy", "lok", "mar", "jou",
];

fn month_number(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    MONTHS_FI
        .iter()
        .position(|m| token.starts_with(m))
        .map(|i| i as u32 + 1)
}

/// Parse a listing date string relative to `today`.
///
/// Accepts `tänään HH:MM`, `eilen HH:MM` and `DD kuu HH:MM` with Finnish
/// abbreviated months. The year is always the current year; the site never
/// shows listings old enough to roll over.
pub fn parse_date_at(raw: &str, today: NaiveDate) -> Result<NaiveDateTime> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let (date, time_token) = match tokens.as_slice() {
        ["tänään", time] => (today, *time),
        ["eilen", time] => (today - Duration::days(1), *time),
        [day, month, time] => {
            let day: u32 = day.parse().map_err(|_| AppError::date_format(raw))?;
            let month = month_number(month).ok_or_else(|| AppError::date_format(raw))?;
            let date = NaiveDate::from_ymd_opt(today.year(), month, day)
                .ok_or_else(|| AppError::date_format(raw))?;
            (date, *time)
        }
        _ => return Err(AppError::date_format(raw)),
    };

    let time =
        NaiveTime::parse_from_str(time_token, "%H:%M").map_err(|_| AppError::date_format(raw))?;
    Ok(date.and_time(time))
}

/// Parse a listing date string against the local calendar.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime> {
    parse_date_at(raw, Local::now().date_naive())
}
