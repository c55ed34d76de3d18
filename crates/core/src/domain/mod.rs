pub mod account;
pub mod call;
pub mod contact;

pub use account::Account;
pub use call::CallContext;
pub use contact::Contact;
