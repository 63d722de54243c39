pub mod accounts;
pub mod comment_mentions;
pub mod comments;
pub mod post_mentions;
pub mod posts;
pub mod username_changes;
