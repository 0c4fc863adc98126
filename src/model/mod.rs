pub mod api;
pub mod district;
pub mod identity;
pub mod mongodb;
pub mod policy;
pub mod poll;
pub mod report;
pub mod store;
