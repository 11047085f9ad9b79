//! askdoc core library: auth gate, backend gateway, session store, document registry
//! and the view controller that ties them together for a front end.

pub mod auth;
pub mod config;
pub mod controller;
pub mod documents;
pub mod gateway;
pub mod session;
pub mod token;

#[cfg(test)]
mod testing;
