use actix_web::web;

use crate::errors::{json_error_handler, query_error_handler};

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod homepage;
pub mod integrations;
pub mod menu;
pub mod payments;
pub mod uploads;
pub mod users;
pub mod webhooks;

/// Register every API route plus the JSON/query error handlers
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .configure(health::config)
        .configure(auth::config)
        .configure(users::config)
        .configure(catalog::config)
        .configure(bookings::config)
        .configure(payments::config)
        .configure(homepage::config)
        .configure(menu::config)
        .configure(integrations::config)
        .configure(webhooks::config)
        .configure(uploads::config);
}
