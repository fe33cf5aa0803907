//! Client-side state: auth session, bootstrap sequencing, signup/verify
//! flows, the admin credential namespace, and the interview session store.

pub mod admin;
pub mod auth;
pub mod bootstrap;
pub mod interview;
pub mod signup;
