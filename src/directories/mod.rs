//! Business directory scrapers

pub mod yellow_pages;

pub use yellow_pages::YellowPages;
