pub mod association;
pub mod business;
pub mod client;
pub mod contact;
pub mod object;
pub mod organization;
pub mod task;
