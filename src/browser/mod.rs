pub mod connection;
pub mod headless;
pub mod tabs;

pub use connection::connect_to_browser;
pub use headless::launch_browser;
pub use tabs::ChromiumTabs;
