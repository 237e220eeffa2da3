pub mod intervention;
pub mod invoice;
pub mod link;
pub mod notification;
