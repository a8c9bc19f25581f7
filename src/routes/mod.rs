pub mod access;
pub mod folders;
pub mod health;
pub mod workflows;
