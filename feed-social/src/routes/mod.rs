pub mod comments;
pub mod feeds;
pub mod friends;
pub mod health;
pub mod index;
pub mod likes;
pub mod posts;
pub mod profile;
