pub mod accounts;
pub mod comments;
pub mod posts;
pub mod username_changes;
