//! Adapters for the domain ports: stores, the payment gateway, notification
//! delivery, and the admin policy.

pub mod in_memory;
pub mod notify;
pub mod paystack;
pub mod policy;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
