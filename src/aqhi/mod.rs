//! Air Quality Health Index (AQHI) feed
//!
//! Fetches the Environmental Protection Department's AQHI RSS feed and turns
//! each station item into an [`AqhiReading`].


use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feed::FeedClient;

/// English AQHI feed for individual monitoring stations
pub const AQHI_FEED_URL: &str = "https://www.aqhi.gov.hk/epd/ddata/html/out/aqhi_ind_rss_Eng.xml";

/// Station type reported when the item description cannot be split
pub const UNKNOWN_STATION_TYPE: &str = "Unknown";

/// Current AQHI at one monitoring station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AqhiReading {
    pub station: String,
    /// Kept as published since the scale tops out at `10+`
    pub aqhi_value: String,
    pub risk_level: String,
    pub station_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    #[serde(default)]
    channel: Vec<RssChannel>,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
}

/// Download the raw AQHI RSS document
#[inline]
pub async fn fetch_aqhi_data(client: &FeedClient, url: &str) -> Result<String> {
    client
        .fetch_xml(url)
        .await
        .with_context(|| format!("Failed to fetch AQHI feed from {}", url))
}

/// Parse the AQHI RSS document into one reading per station.
///
/// Items whose title is not of the form `station : value : risk` are skipped.
#[inline]
pub fn parse_aqhi_data(xml: &str) -> Result<Vec<AqhiReading>> {
    let document: RssDocument =
        quick_xml::de::from_str(xml.trim_start()).context("Failed to parse AQHI RSS document")?;

    let Some(channel) = document.channel.into_iter().next() else {
        warn!("AQHI feed contains no channel");
        return Ok(Vec::new());
    };

    let readings: Vec<AqhiReading> = channel.items.iter().filter_map(parse_item).collect();
    debug!("Parsed {} AQHI readings", readings.len());
    Ok(readings)
}

fn parse_item(item: &RssItem) -> Option<AqhiReading> {
    let title_parts: Vec<&str> = item.title.split(" : ").collect();
    let [station, aqhi_value, risk_level, ..] = title_parts.as_slice() else {
        debug!("Skipping AQHI item with unexpected title: {:?}", item.title);
        return None;
    };

    Some(AqhiReading {
        station: station.trim().to_string(),
        aqhi_value: aqhi_value.trim().to_string(),
        risk_level: risk_level.trim().to_string(),
        station_type: station_type(&item.description),
        observed_at: item.pub_date.as_deref().and_then(observed_at),
    })
}

/// `"<station> - <type>: <value> <risk> - <time>"` yields `<type>`
fn station_type(description: &str) -> String {
    description
        .trim()
        .split(" - ")
        .nth(1)
        .and_then(|segment| segment.split_once(':'))
        .map_or_else(
            || UNKNOWN_STATION_TYPE.to_string(),
            |(kind, _)| kind.trim().to_string(),
        )
}

fn observed_at(pub_date: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(pub_date.trim())
        .map(|date| date.to_rfc3339())
        .ok()
}

/// Fetch and parse the current AQHI for every station
#[inline]
pub async fn get_current_aqhi(client: &FeedClient, url: &str) -> Result<Vec<AqhiReading>> {
    let xml = fetch_aqhi_data(client, url).await?;
    parse_aqhi_data(&xml)
}
