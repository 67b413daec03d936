//! Mobile-money transfer demo backend.
//!
//! Transfers are kept in a [`store::TransactionStore`], advanced through their
//! lifecycle by the [`settlement::Simulator`], and announced to websocket
//! clients as they change. The [`gateway`] module hosts the mock card and
//! M-Pesa endpoints used by the payment pages.

pub mod api;
pub mod core;
pub mod domain;
pub mod gateway;
pub mod settlement;
pub mod store;
pub mod stream;
