mod claims;
mod password;

pub use claims::{Claims, ClaimsBuilder};
pub use password::{hash_password, verify_absent_account, verify_password, HASH_COST};
