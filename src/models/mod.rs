pub mod api_request;
pub mod comments;
pub mod incident;
pub mod linear;
pub mod notification;
pub mod slack;
pub mod ticketsystem;
