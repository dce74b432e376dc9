pub mod twiml;

pub use twiml::message_response;
