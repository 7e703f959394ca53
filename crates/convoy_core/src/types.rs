pub use self::built_asset::*;
pub use self::content_type::*;
pub use self::expanded_assets::*;
pub use self::generated_asset::*;
pub use self::minify::*;
pub use self::source_asset::*;

mod built_asset;
mod content_type;
mod expanded_assets;
mod generated_asset;
mod minify;
mod source_asset;
