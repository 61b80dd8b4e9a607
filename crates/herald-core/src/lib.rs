//! Herald core: classification, routing, confirmation and shared plumbing for the assistant.

pub mod assistant;
pub mod cache;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod handler;
pub mod retry;
pub mod router;
pub mod session;
pub mod types;

pub use assistant::Assistant;
pub use cache::{TtlCache, DEFAULT_CACHE_CAPACITY};
pub use classifier::{Classifier, ModelClassifier, RuleClassifier};
pub use collaborators::{
    CategoryProvider, ContentGenerator, MessageDraft, MessagingProvider, PageReader, PageSummary,
    ReminderItem, ReminderStore, SearchHit, SearchProvider, SendReceipt, StructuredClassifier,
};
pub use config::{
    CacheConfig, ClassifierConfig, ConfirmationConfig, HeraldConfig, RealTimeConfig, RouterConfig,
    SessionsConfig, SkillsConfig,
};
pub use confirmation::{
    ConfirmationMachine, ConfirmationSignal, ConfirmationState, PendingAction, PendingActionKind,
    SignalDetector,
};
pub use error::{CollaboratorError, ErrorKind, HeraldError, HeraldResult, TIMEOUT_MESSAGE};
pub use handler::{CapabilityHandler, ConfirmableHandler, HandlerContext, HandlerRegistry};
pub use retry::RetryPolicy;
pub use router::{Router, ROUTER_SOURCE};
pub use session::{SessionState, SessionStore};
pub use types::{
    ClassificationResult, ClassifierStrategy, Details, HandlerResult, RealTimeCategory,
    RealTimeRequest, ResultStatus, Task, TaskCategory,
};
