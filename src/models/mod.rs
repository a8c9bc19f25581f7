pub mod access;
pub mod folder;
pub mod provider;
pub mod workflow;
