mod opaque_key;
mod payment_signature;

pub use opaque_key::{new_founder_code, new_session_key_candidate, random_token, KEY_ALPHABET, MAX_KEY_ATTEMPTS};
pub use payment_signature::{PaymentSignature, PaymentSignatureError};
