pub mod aggregate;
pub mod locale;
pub mod response;

pub use aggregate::{ProductRecord, ProductView};
pub use locale::{resolve_localized, Locale, LocalizedField, LocalizedFields};
pub use response::ProductListResponse;
