pub mod api_connection;
pub mod cli;
pub mod config;
pub mod day_aggregator;
pub mod error;
pub mod food_data;
pub mod grocery;
pub mod limiter;
pub mod meal_compiler;
pub mod meal_ideas;
pub mod models;
pub mod nutrition;
pub mod optim;
pub mod pipeline;
pub mod render;
pub mod schema;
