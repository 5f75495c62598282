pub mod app;
pub mod multipart;
pub mod provider;

pub use app::make_test_app;
pub use multipart::MultipartBody;
pub use provider::ScriptedProvider;
