pub mod bus;
pub mod js_executor;
pub mod page_surface;
pub mod store;

pub use bus::Outbox;
pub use js_executor::JsExecutor;
pub use page_surface::{FetchReply, PageSurface, Tab, TabOpener};
pub use store::{SessionStore, SettingsPatch, StoreDocument, StoreReader};
