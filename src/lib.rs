//! Paged and grouped record collections over Odoo JSON-RPC.
//!
//! A [`Collection`] translates fetch options (filter, order, limit/offset,
//! group-by) into `search_read` / `read_group` calls and rebuilds records,
//! pages and lazily-expanded group rows from the replies.
//!
//! # Usage
//!
//! ```ignore
//! use openerp_pager::*;
//!
//! let transport = HttpTransport::from_config(&ClientConfig::load(&ClientConfig::default_path())?)?;
//! let query = ModelQuery::new(ModelConfig::new("res.partner")?, SyncAdapter::new(Arc::new(transport)));
//! let mut partners = Collection::new(query).with_page_size(20);
//!
//! partners
//!     .paginate(FetchOptions::new().filter(Domain::new().with("is_company", Operator::Eq, true)).order(["name"]))
//!     .await?;
//! while partners.next_page().await? { /* ... */ }
//!
//! partners.fetch(FetchOptions::new().group_by(["country_id"])).await?;
//! partners.expand_groups().await?;
//! ```

pub mod collection;
pub mod config;
pub mod domain;
pub mod error;
pub mod group;
pub mod mapper;
pub mod mock;
pub mod options;
pub mod query;
pub mod record;
pub mod sync;
pub mod transport;

pub use collection::{Collection, ModelQuery, Pager};
pub use config::{ClientConfig, ModelConfig};
pub use domain::{Condition, Connective, Domain, DomainTerm, Operator};
pub use error::PagerError;
pub use group::{GroupModel, GroupQuery, GroupRow};
pub use mapper::{Items, Mapped, ResultMapper};
pub use mock::{MockTransport, RecordedCall};
pub use options::{FetchOptions, GroupFactory};
pub use query::{PagedQueryBuilder, RpcRequest};
pub use record::{Record, RecordId};
pub use sync::{Connection, SyncAdapter, SyncMethod, SyncOutcome};
pub use transport::{HttpTransport, NoSession, PasswordLogin, SessionSource, StaticSession, Transport};
