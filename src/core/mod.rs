pub mod answer;
pub mod db;
pub mod locate;
pub mod object_id;
pub mod query;
pub mod reconciler;
pub mod sector;
pub mod tree;
