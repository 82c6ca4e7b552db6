mod activation;
mod admin;
mod download;
mod product;
mod sale;
mod settings;

pub use activation::*;
pub use admin::*;
pub use download::*;
pub use product::*;
pub use sale::*;
pub use settings::*;
