pub mod indicator;
pub mod model;
pub mod report;
pub mod services;
pub mod task;
pub mod universe;
pub mod yahoo;
