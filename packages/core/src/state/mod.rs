// Состояние на время одного запроса

pub mod session;

pub use session::UnlockedSession;
