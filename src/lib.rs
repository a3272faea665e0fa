// Password hashing
pub mod credentials;

// Linearized user record store
pub mod identity;

// Signed session tokens
pub mod token;

// Authorization header parsing
pub mod auth;

// Error taxonomy shared by the service and HTTP layers
pub mod error;

// OAuth provider clients
pub mod oauth;

// Account-linking state machine
pub mod linking;

// Exposed identity operations
pub mod service;

// HTTP API
pub mod api;

// Configuration loading
pub mod config;
