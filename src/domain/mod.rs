//! Domain layer: value objects, fetched-record aggregates, events and the
//! pure decision services.

pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;
