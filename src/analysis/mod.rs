//! Sentiment analysis service.
//!
//! # Data Flow
//! ```text
//! POST /sentiment
//!     → server.rs (auth, validation)
//!     → classifier.rs (SentimentClassifier → inference server)
//!     → store.rs (when database support is enabled)
//! ```

pub mod classifier;
pub mod model;
pub mod server;
pub mod store;
pub mod types;

pub use classifier::{InferenceClassifier, SentimentClassifier};
pub use model::{load_model, preload};
pub use server::{AnalysisServer, AnalysisState};
pub use store::{SentimentRecord, SentimentStore};
pub use types::{
    AnalysedElement, AnalysisError, AnalysisResult, Classification, SentimentElement,
    SentimentRequest, SentimentResponse,
};
