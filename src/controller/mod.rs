pub mod child_resources;
pub mod conditions;
pub mod helpers;
pub mod hostproxy;
pub mod phases;
pub mod pipeline;
