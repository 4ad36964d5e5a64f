pub mod hash;
pub mod ingest;
pub mod inspect;
pub mod matching;
