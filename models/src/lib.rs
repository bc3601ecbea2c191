//! Shared entity types for the engagement platform.
//!
//! Every row struct derives `sqlx::FromRow` so the service, the seed
//! script, and the tests all read the same shapes out of the store.

pub mod db;
pub mod event;
pub mod merch;
pub mod points;
pub mod user;

pub use event::{
    Event, EventType, Feedback, Minigame, Participation, Quiz, QuizAnswer, QuizQuestion,
};
pub use merch::{MerchOrder, MerchType, Merchandise, OrderStatus};
pub use points::{PointTransaction, TransactionKind};
pub use user::{NewUser, StudentProfile, User, UserRole};
