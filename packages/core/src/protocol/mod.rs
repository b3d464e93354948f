// Протокол сообщений: конверты, их проверка, wire format и декодирование

pub mod codec;
pub mod envelope;
pub mod validation;
pub mod wire;

pub use codec::{DecodePath, DisplayFields, MessageCodec, ViewerKey};
pub use envelope::MessageEnvelope;
