/// Club roster scraping and caching
///
/// Thin I/O glue around the club's program archive and SoundCloud: who
/// plays on which night, and how many followers they bring. The follower
/// totals per event night are the main popularity feature for the model.
pub mod cache;
pub mod scraper;

pub use cache::{followers_by_date, FollowersByDate, RosterCache, RosterCacheManager};
pub use scraper::{ArtistRecord, EventEntry, RosterScraper};
