pub mod sp500;

pub use sp500::{
    normalize_listing_symbol, parse_constituents, write_listing, Constituent, UniverseClient,
};
