//! Input readers for the audit pipeline.
//!
//! All inputs are optional uploads: XML sitemaps (possibly nested
//! sitemap indices), a search-analytics CSV export, a redirect-map CSV,
//! or a plain URL list. Readers normalize them into value records; they
//! never touch the document store.

mod csv;
mod sitemap;

pub use csv::{extract_url_list, read_analytics, read_redirect_map, AnalyticsEntry, RedirectMap};
pub use sitemap::{SitemapEntry, SitemapReader};
