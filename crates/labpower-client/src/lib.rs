//! labpower-client: HTTP client library
//!
//! Talks to the labpower daemon: log in, list the fleet, issue power actions
//! and read the audit log.
//!
//! # Examples
//!
//! ```no_run
//! use labpower_client::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = HttpClient::new("http://localhost:8080")?;
//!
//! // Open a session
//! let session = client.login("instructor", "lab123").await?;
//! println!("logged in until {}", session.expires_at);
//!
//! // Restart one machine
//! let outcome = client.restart("192.168.9.37").await?;
//! println!("{}", outcome.message);
//!
//! // Last ten audit entries
//! for entry in client.audit(Some(10)).await? {
//!     println!("{} {} {} {}", entry.timestamp, entry.actor, entry.action, entry.target);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;

pub use error::{ClientError, Result};
pub use http::HttpClient;
