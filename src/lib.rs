//! Blocking client for the radstore resource API.
//!
//! Products (metadata plus a binary payload) and transformations (which
//! link products as inputs and outputs) are mapped onto plain structs that
//! know how to query, create and update themselves.
//!
//! ```no_run
//! use radstore_client::{Client, Product, Resource};
//!
//! # fn main() -> radstore_client::Result<()> {
//! let client = Client::new("http://localhost:3003/api/v1")?;
//! let radar = Product::query(&client).filter([("variable", "dBZ")]);
//! println!("{} products", radar.count()?);
//! for product in radar.all()? {
//!     let product = product?;
//!     println!("{:?} {}", product.id(), product.field("name")?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cmdline;
pub mod config;
pub mod error;
pub mod logging;
pub mod product;
pub mod query;
pub mod resource;
pub mod transformation;
pub mod transport;

pub use client::Client;
pub use cmdline::{parse_cmdline, CommandLine};
pub use error::{Error, Result};
pub use product::Product;
pub use query::Query;
pub use resource::{Record, Resource};
pub use transformation::{ProductRef, Transformation};
pub use transport::{HttpBackend, HttpRequest, HttpResponse, Transport};
