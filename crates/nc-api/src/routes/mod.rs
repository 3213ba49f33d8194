pub mod channels;
pub mod jobs;
pub mod publish_history;
pub mod route_rules;
pub mod sources;
pub mod stats;
pub mod topics;
