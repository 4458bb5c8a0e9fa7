//! Document models shared by the conversion pipelines.

pub mod notebook;
