pub mod principal;

pub use principal::{RequestPrincipal, ACCOUNT_UUID_HEADER};
