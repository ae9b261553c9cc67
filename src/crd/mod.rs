pub mod hostproxy;
