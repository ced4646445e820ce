pub mod feed;
pub mod likes;
pub mod migrate;
pub mod token;
