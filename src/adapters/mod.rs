pub mod csv_feed;
pub mod synthetic_feed;
