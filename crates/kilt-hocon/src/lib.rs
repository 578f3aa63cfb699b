//! Kilt configuration language
//!
//! A HOCON-family configuration format, limited to what recipes use.
//!
//! # Core Concepts
//!
//! - [`Document`]: parsed text, fields kept in source order
//! - [`ConfigBuilder`]: stacks documents, later layers win
//! - [`Config`]: merged tree, resolved into [`serde_json::Value`]
//! - [`ConfigPath`]: dotted addressing with quoted segments
//!
//! # Supported syntax
//!
//! - root object with or without braces, `key: v`, `key = v`, `key { .. }`, `key += v`
//! - dotted and quoted keys, `#` and `//` comments
//! - quoted, triple-quoted and unquoted strings, numbers, booleans, `null`
//! - arrays and objects separated by commas or newlines
//! - value concatenation and `${path}` / `${?path}` substitutions
//!
//! # Example
//!
//! ```rust
//! use kilt_hocon::Config;
//!
//! let config = Config::parse("recipe", r#"
//!     original.command: ["/app"]
//!     build {
//!         entry_point: ["/kilt/run", "--"]
//!         command: [] ${?original.command}
//!     }
//! "#)?;
//! let value = config.resolve()?;
//! assert_eq!(value["build"]["command"], serde_json::json!(["/app"]));
//! # Ok::<(), kilt_hocon::HoconError>(())
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod config;
mod error;
mod lexer;
mod parser;
mod path;
mod resolve;
mod tree;

pub use config::{Config, ConfigBuilder};
pub use error::{HoconError, HoconResult};
pub use parser::Document;
pub use path::{ConfigPath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
