pub mod finalized_track;
pub mod sample;
pub mod signature_store;
pub mod similarity_matcher;
pub mod track_aggregator;
