//! # Repository Module
//!
//! Row-level database access for Velo POS.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pooled repositories (catalog setup, reads)                             │
//! │       db.shops().create("Velo Works")                                  │
//! │       db.products().get_by_id(shop_id, id)                            │
//! │                                                                         │
//! │  Connection functions (inside a unit of work)                          │
//! │       sale::insert_sale(uow.conn(), &sale)                             │
//! │       repair_job::claim_for_sale(uow.conn(), ...)                      │
//! │                                                                         │
//! │  Workflow managers combine the second kind into atomic operations;    │
//! │  nothing outside this crate writes sales, jobs or services directly.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ShopRepository`](shop::ShopRepository) - Shop registration
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - `sale`, `service`, `repair_job` - Document rows for the workflows

pub mod product;
pub(crate) mod repair_job;
pub(crate) mod sale;
pub(crate) mod service;
pub mod shop;
