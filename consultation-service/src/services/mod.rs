pub mod classifier;
pub mod database;
pub mod metrics;
pub mod providers;
pub mod responder;
pub mod twilio;

pub use database::{ConsultationDb, ConsultationStore};
pub use metrics::{get_metrics, init_metrics};
pub use responder::Responder;
pub use twilio::TwilioClient;
