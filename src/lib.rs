//! Rust's resilient bearer-token depot - tiered token caching with durable mirrors, rate-limit
//! backoff, and stale fallback in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod error;
pub mod http;
pub mod issuer;
pub mod manager;
pub mod oauth;
pub mod obs;
pub mod policy;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
