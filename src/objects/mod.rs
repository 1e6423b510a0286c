pub mod ceremony;
pub use ceremony::*;

pub mod contribution;
pub use contribution::*;

pub mod history;
pub use history::*;

pub mod parameters;
pub use parameters::*;

pub mod receipts;
pub use receipts::*;

pub mod registry_entry;
pub use registry_entry::*;

pub mod requests;
pub use requests::*;

pub mod verification;
pub use verification::*;

pub mod verification_key;
pub use verification_key::*;
